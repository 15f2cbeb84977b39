use anyhow::Result;
use std::path::Path;

use momfit_events::ChatMessage;
use momfit_intent::DetectionContext;

use super::context::App;

/// Classify `text`. With both `community` and `user`, run it through the chat
/// pipeline so actionable event intents reach the admins.
pub async fn run(
    base_dir: &Path,
    text: &str,
    community: Option<&str>,
    user: Option<&str>,
) -> Result<()> {
    let app = App::open(base_dir).await?;

    let (Some(community), Some(user)) = (community, user) else {
        let context = DetectionContext {
            community_id: community.map(str::to_string),
            user_id: user.map(str::to_string),
        };
        let result = app.detector.detect(text, &context).await;
        println!("Intent:     {}", result.intent);
        println!("Confidence: {:.2}", result.confidence);
        println!("Source:     {}", result.source);
        println!("Actionable: {}", result.is_actionable_event());
        if !result.entities.is_empty() {
            println!("Entities:");
            println!("{}", serde_json::to_string_pretty(&result.entities)?);
        }
        return Ok(());
    };

    let message = ChatMessage::new(community, user, text);
    match app.pipeline.process_message(&message).await? {
        Some(notification) => {
            println!(
                "Event suggestion {} sent to admins of {community} (confidence {:.2})",
                notification.id, notification.confidence
            );
        }
        None => println!("No actionable event intent detected."),
    }
    Ok(())
}
