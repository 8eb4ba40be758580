pub mod address;

pub use address::{decode_adnl_address, decode_public_key_base64, FriendlyAddress};
