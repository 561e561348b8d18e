pub mod clipboard;
pub mod notice;
pub mod relay;
pub mod scroll;
pub mod session;

pub use relay::{ ClientError, FragmentStream, HttpRelayClient, RelayClient };
pub use session::{ converse, pump, ChatSession, Phase, StreamEvent };
