//! Property-based tests for the wire encoders and decoders.
//!
//! Uses proptest to verify:
//! 1. Percent-encoding round-trips for arbitrary UTF-8 input.
//! 2. The user descriptor survives encode → decode round-trips,
//!    including unicode and quote-containing names.
//! 3. Arbitrary bytes never cause a panic in the decoders (they
//!    return `Err` gracefully).

use proptest::prelude::*;

use ningchat_proto::chat::{decode_chat_login, decode_message_batch, decode_roster};
use ningchat_proto::encode::{form_body, percent_decode, percent_encode};
use ningchat_proto::user::UserDescriptor;

/// Strategy for names as they appear on real profiles: unicode,
/// quotes, the works.
fn arb_name() -> impl Strategy<Value = String> {
    "[^\x00]{0,64}"
}

fn arb_user() -> impl Strategy<Value = UserDescriptor> {
    (arb_name(), arb_name(), any::<bool>(), "[a-z0-9]{1,16}", any::<bool>()).prop_map(
        |(name, icon_url, is_admin, ning_id, is_nc)| UserDescriptor {
            name,
            icon_url,
            is_admin,
            ning_id,
            is_nc,
        },
    )
}

proptest! {
    #[test]
    fn percent_encoding_round_trips(s in "\\PC*") {
        prop_assert_eq!(percent_decode(&percent_encode(&s)), s);
    }

    #[test]
    fn form_body_values_decode_back(value in "\\PC{0,64}") {
        let body = form_body(&[("message", &value)]);
        let encoded = body.strip_prefix("message=").unwrap();
        // Keys are emitted as-is, so the separator structure survives
        // any value content.
        prop_assert!(!encoded.contains('&'));
        prop_assert!(!encoded.contains('='));
        prop_assert_eq!(percent_decode(encoded), value);
    }

    #[test]
    fn user_descriptor_round_trips(user in arb_user()) {
        let decoded = UserDescriptor::from_json(user.to_json().as_bytes());
        prop_assert_eq!(decoded, Ok(user));
    }

    #[test]
    fn message_batch_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_message_batch(&bytes);
    }

    #[test]
    fn roster_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_roster(&bytes);
    }

    #[test]
    fn chat_login_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_chat_login(&bytes);
    }
}
