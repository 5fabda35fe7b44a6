//! Proptest generators for property-based testing.

use proptest::prelude::*;

use stowage::core::ExtraParams;
use stowage::ContentDescriptor;

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a file extension, possibly empty.
pub fn extension() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z0-9]{1,5}".prop_map(|ext| format!(".{ext}")),
    ]
}

/// Generate a plain original file name.
pub fn original_name() -> impl Strategy<Value = String> {
    ("[a-zA-Z0-9_-]{1,24}", extension()).prop_map(|(stem, ext)| format!("{stem}{ext}"))
}

/// Generate caller-supplied extra params.
pub fn extra_params() -> impl Strategy<Value = ExtraParams> {
    prop::collection::btree_map(
        "[a-z]{1,8}",
        prop_oneof![
            "[ -~]{0,16}".prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            any::<bool>().prop_map(serde_json::Value::from),
        ],
        0..4,
    )
}

/// Parameters for one upload.
#[derive(Debug, Clone)]
pub struct UploadParams {
    pub original_name: String,
    pub payload: Vec<u8>,
    pub extra_params: ExtraParams,
}

impl UploadParams {
    /// The hashed descriptor for this upload.
    pub fn descriptor(&self) -> ContentDescriptor {
        ContentDescriptor::hashed(
            self.original_name.clone(),
            &self.payload,
            self.extra_params.clone(),
        )
    }
}

impl Arbitrary for UploadParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (original_name(), payload(1024), extra_params())
            .prop_map(|(original_name, payload, extra_params)| UploadParams {
                original_name,
                payload,
                extra_params,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage::core::suffix;

    proptest! {
        #[test]
        fn test_stored_name_deterministic(params: UploadParams) {
            prop_assert_eq!(params.descriptor(), params.descriptor());
        }

        #[test]
        fn test_stored_name_is_hex_plus_suffix(params: UploadParams) {
            let d = params.descriptor();
            let hex = d.fingerprint().unwrap().to_hex();

            prop_assert!(d.stored_name().starts_with(&hex));
            prop_assert_eq!(&d.stored_name()[hex.len()..], suffix(&params.original_name));
        }

        #[test]
        fn test_stored_name_ignores_params(params: UploadParams, other in extra_params()) {
            let renamed = UploadParams { extra_params: other, ..params.clone() };
            prop_assert_eq!(
                params.descriptor().stored_name().to_string(),
                renamed.descriptor().stored_name().to_string()
            );
        }

        #[test]
        fn test_different_payload_different_name(
            name in original_name(),
            p1 in payload(64),
            p2 in payload(64),
        ) {
            prop_assume!(p1 != p2);

            let d1 = ContentDescriptor::hashed(name.clone(), &p1, ExtraParams::new());
            let d2 = ContentDescriptor::hashed(name, &p2, ExtraParams::new());
            prop_assert_ne!(d1.stored_name(), d2.stored_name());
        }
    }
}
