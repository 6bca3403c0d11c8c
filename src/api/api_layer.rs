// The api module contains the HTTP adapters over the core services.

#[path = "moderation/routes.rs"]
pub mod moderation;
