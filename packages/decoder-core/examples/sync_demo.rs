//! # Sync Demo
//!
//! Exports one device's data and imports it on another.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example sync_demo
//! ```

use decoder_core::{Conversation, LocalStore, Message, Profile, StoreConfig};

#[tokio::main]
async fn main() -> decoder_core::Result<()> {
    println!("=== Text Decoder: Sync Export / Import Demo ===\n");

    // Step 1: Populate the first device
    println!("Step 1: Saving a conversation and a profile on device A...");

    let phone = LocalStore::new(StoreConfig::in_memory());
    phone.init().await?;

    let mut conversation = Conversation::new();
    conversation.title = Some("Weekend plans".into());
    conversation.push_message(Message::new("Riley", "Are we still on for Saturday?"));
    conversation.push_message(Message::new("Me", "Yes, see you at 10."));

    let mut profile = Profile::new("Riley");
    profile.link_conversation(conversation.id.clone());

    phone.save_conversation(&conversation).await?;
    phone.save_profile(&profile).await?;
    phone.save_setting("theme", "dark").await?;
    phone.save_secure("gemini_api_key", "never-leaves-this-device").await?;

    println!("  conversation: {}", conversation.id);
    println!("  profile:      {} ({})", profile.name, profile.id);
    println!();

    // Step 2: Export
    println!("Step 2: Exporting with a passphrase...");
    let passphrase = "correct horse battery staple";
    let blob = phone.export_data_for_sync(passphrase).await?;
    let preview: String = blob.chars().take(48).collect();
    println!("  blob: {}... ({} chars)", preview, blob.len());
    println!("  user hash: {}", phone.generate_user_hash("riley@example.com"));
    println!();

    // Step 3: Import on the second device
    println!("Step 3: Importing on device B...");
    let laptop = LocalStore::new(StoreConfig::in_memory());
    laptop.init().await?;

    let summary = laptop.import_data_from_sync(&blob, passphrase).await?;
    println!(
        "  imported {} conversation(s), {} profile(s), {} setting(s)",
        summary.conversations, summary.profiles, summary.settings
    );

    let linked = laptop.get_profile_conversations(&profile.id).await?;
    println!("  {} has {} linked conversation(s)", profile.name, linked.len());
    println!(
        "  secure entry on device B: {:?}",
        laptop.get_secure("gemini_api_key").await?
    );
    println!();

    // Step 4: Wrong passphrase
    println!("Step 4: Importing with the wrong passphrase...");
    match laptop.import_data_from_sync(&blob, "wrong").await {
        Ok(_) => println!("  unexpectedly succeeded"),
        Err(e) => println!("  rejected: {} (code {})", e, e.code()),
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
