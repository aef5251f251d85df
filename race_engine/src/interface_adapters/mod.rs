// Interface adapters: wire protocol, routes, file-backed stores and trace profiles.

pub mod http;
pub mod net;
pub mod profile;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod stores;
pub mod tracks;
