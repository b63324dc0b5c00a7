//! Telegram integration - the bot's chat-transport boundary
//!
//! This crate provides the Telegram interface for dreampoll:
//! - **Transport** (`transport`) - outbound trait: messages, polls, stop-poll
//! - **Bot API client** (`api`) - reqwest client speaking the Bot API
//! - **Commands** (`commands`) - `/poll`, `/enable_polling`, etc.
//! - **Events** (`events`) - inbound updates routed to handlers
//! - **Update runner** (`updates`) - long-poll loop with bounded retries
//!
//! # Getting Started
//!
//! 1. Create a bot with @BotFather and copy the token
//! 2. Add the bot to the broadcast channel as an admin
//! 3. Set env vars: `DREAMPOLL_BOT_TOKEN`, `DREAMPOLL_CHANNEL_ID`
//!
//! # Architecture
//!
//! ```text
//! getUpdates → PollingRunner → EventDispatcher → Handlers → Core
//!                                    ↓
//!                           ChatTransport ← Replies
//! ```
//!
//! # Key Types
//!
//! - `BotApi` - HTTP client implementing both transport traits
//! - `PollingRunner` - update loop with reconnection logic
//! - `EventDispatcher` - routes events to appropriate handlers
//! - `BotCommandService` - trait for command handlers

pub mod api;
pub mod commands;
pub mod events;
pub mod transport;
pub mod updates;
