pub mod chat_request;
pub mod chat_route;
pub mod ui_message_stream;
