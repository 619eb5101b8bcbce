//! WebSocket Real-Time Streaming
//!
//! Pushes every stored reading to connected viewers.
//!
//! ## Architecture
//!
//! - **BroadcastHub**: Registry of live observers and fan-out
//! - **Handler**: Accepts connections and ties their lifetime to the hub
//! - **Messages**: The `{temperature, humidity}` push payload
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:3001/');
//!
//! ws.onmessage = (event) => {
//!   const { temperature, humidity } = JSON.parse(event.data);
//!   console.log('Reading:', temperature, humidity);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{BroadcastHub, BroadcastReport, DeliveryError, HubConfig, ObserverId};
pub use messages::ReadingUpdate;
