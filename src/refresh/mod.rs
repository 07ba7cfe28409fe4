//! Refresh notifications
//!
//! After a successful mutation the API emits a [`RefreshEvent`] on the
//! [`RefreshBus`]. Subscribers react per user:
//!
//! - **MealsCache** drops the user's cached days on `today`/`meals`
//! - **ConnectionHub** forwards `{"type":"refresh","event":...}` frames to
//!   the user's WebSocket connections
//!
//! ## Topics
//!
//! Clients connect to `/ws?user_id=...` and subscribe to:
//! - `refresh.*` - every refresh event
//! - `refresh.{event}` - one event (`today`, `meals`, `weight`, `goals`, `profile`)
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws?user_id=' + userId);
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['refresh.meals']}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'refresh') reload(msg.event);
//! };
//! ```

pub mod bus;
mod handler;
mod hub;
mod messages;

pub use bus::{RefreshBus, RefreshEvent, RefreshSubscriber, SubscriberRef};
pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage};
