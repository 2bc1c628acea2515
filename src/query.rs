// Query construction
//
// Each request kind maps to a fixed, ordered template of query slots.
// Adding a kind means adding a template, not new control flow.

use crate::error::DispatchError;
use crate::kind::RequestKind;
use crate::params::{RequestParams, LIMIT, USERNAME, VIDEO_URL};

/// Query key carrying the API key
pub const KEY_PARAM: &str = "key";

/// Query key carrying the kind discriminator
pub const TYPE_PARAM: &str = "type";

/// Default following-list size when no limit is given
pub const DEFAULT_FOLLOWING_LIMIT: &str = "100";

const REDACTED: &str = "***";

/// How query values are escaped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EncodingMode {
    /// Percent-encode every value
    #[default]
    Uniform,
    /// Legacy request bytes: only opaque values
    /// (`video_url`) are encoded, everything else goes in verbatim
    Legacy,
}

/// When an input parameter is emitted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Presence {
    /// Must be non-blank, otherwise the dispatch is rejected
    Required,
    /// Emitted only when non-blank
    Optional,
    /// Emitted always; the default stands in for an absent or empty value
    Defaulted(&'static str),
}

#[derive(Clone, Copy, Debug)]
struct ParamSlot {
    name: &'static str,
    presence: Presence,
    /// Always percent-encoded, whatever the encoding mode
    opaque: bool,
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    ApiKey,
    Type,
    Param(ParamSlot),
}

const fn required(name: &'static str) -> Slot {
    Slot::Param(ParamSlot {
        name,
        presence: Presence::Required,
        opaque: false,
    })
}

const USERNAME_SLOT: Slot = required(USERNAME);

/// Ordered query slots for a kind. Order matches what the upstream
/// service has always been sent.
fn template(kind: RequestKind) -> &'static [Slot] {
    match kind {
        RequestKind::Profile => &[Slot::ApiKey, USERNAME_SLOT],
        RequestKind::FullProfile => &[Slot::ApiKey, USERNAME_SLOT, Slot::Type],
        RequestKind::Stories => &[Slot::ApiKey, USERNAME_SLOT, Slot::Type],
        RequestKind::Domain => &[Slot::ApiKey, Slot::Type, USERNAME_SLOT],
        RequestKind::Following => &[
            Slot::ApiKey,
            USERNAME_SLOT,
            Slot::Type,
            Slot::Param(ParamSlot {
                name: LIMIT,
                presence: Presence::Defaulted(DEFAULT_FOLLOWING_LIMIT),
                opaque: false,
            }),
        ],
        RequestKind::Comments => &[
            Slot::ApiKey,
            Slot::Type,
            Slot::Param(ParamSlot {
                name: VIDEO_URL,
                presence: Presence::Required,
                opaque: true,
            }),
            Slot::Param(ParamSlot {
                name: USERNAME,
                presence: Presence::Optional,
                opaque: false,
            }),
        ],
        RequestKind::AccountInfo => &[Slot::ApiKey, Slot::Type, USERNAME_SLOT],
    }
}

/// Names of the parameters a kind must be given
pub fn required_params(kind: RequestKind) -> Vec<&'static str> {
    template(kind)
        .iter()
        .filter_map(|slot| match slot {
            Slot::Param(p) if p.presence == Presence::Required => Some(p.name),
            _ => None,
        })
        .collect()
}

/// Names of the parameters a kind accepts but does not require
pub fn optional_params(kind: RequestKind) -> Vec<&'static str> {
    template(kind)
        .iter()
        .filter_map(|slot| match slot {
            Slot::Param(p) if p.presence != Presence::Required => Some(p.name),
            _ => None,
        })
        .collect()
}

/// A single query key/value before encoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPair {
    pub key: &'static str,
    pub value: String,
    opaque: bool,
    secret: bool,
}

/// Resolved, ordered query for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPlan {
    kind: RequestKind,
    pairs: Vec<QueryPair>,
}

impl QueryPlan {
    /// Resolve a kind's template against user parameters.
    ///
    /// Fails with `MissingRequiredField` on the first required parameter
    /// that is absent, empty, or whitespace-only.
    pub fn build(
        kind: RequestKind,
        api_key: &str,
        params: &RequestParams,
    ) -> Result<Self, DispatchError> {
        let slots = template(kind);
        let mut pairs = Vec::with_capacity(slots.len());

        for slot in slots {
            match slot {
                Slot::ApiKey => pairs.push(QueryPair {
                    key: KEY_PARAM,
                    value: api_key.to_string(),
                    opaque: false,
                    secret: true,
                }),
                Slot::Type => {
                    // Profile has no Type slot, so this is always Some
                    if let Some(value) = kind.type_value() {
                        pairs.push(QueryPair {
                            key: TYPE_PARAM,
                            value: value.to_string(),
                            opaque: false,
                            secret: false,
                        });
                    }
                }
                Slot::Param(p) => {
                    let value = match p.presence {
                        Presence::Required => Some(
                            params
                                .get_non_blank(p.name)
                                .ok_or(DispatchError::MissingRequiredField {
                                    kind,
                                    field: p.name,
                                })?
                                .to_string(),
                        ),
                        Presence::Optional => params.get_non_blank(p.name).map(str::to_string),
                        Presence::Defaulted(default) => Some(
                            params
                                .get(p.name)
                                .filter(|v| !v.is_empty())
                                .unwrap_or(default)
                                .to_string(),
                        ),
                    };

                    if let Some(value) = value {
                        pairs.push(QueryPair {
                            key: p.name,
                            value,
                            opaque: p.opaque,
                            secret: false,
                        });
                    }
                }
            }
        }

        let ignored: Vec<&str> = params
            .iter()
            .map(|(name, _)| name)
            .filter(|name| {
                !slots
                    .iter()
                    .any(|slot| matches!(slot, Slot::Param(p) if p.name == *name))
            })
            .collect();
        if !ignored.is_empty() {
            tracing::debug!(kind = %kind, ignored = ?ignored, "Ignoring unused parameters");
        }

        Ok(Self { kind, pairs })
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn pairs(&self) -> &[QueryPair] {
        &self.pairs
    }

    /// Value for a query key, unencoded
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Encoded query string, without the leading `?`
    pub fn to_query_string(&self, mode: EncodingMode) -> String {
        self.render(mode, false)
    }

    /// Encoded query string with the API key masked, for logs
    pub fn redacted(&self, mode: EncodingMode) -> String {
        self.render(mode, true)
    }

    /// Append the query to a base URL
    pub fn to_url(&self, base_url: &str, mode: EncodingMode) -> String {
        join_url(base_url, &self.to_query_string(mode))
    }

    /// Like `to_url`, with the API key masked
    pub fn to_redacted_url(&self, base_url: &str, mode: EncodingMode) -> String {
        join_url(base_url, &self.redacted(mode))
    }

    fn render(&self, mode: EncodingMode, mask_secrets: bool) -> String {
        self.pairs
            .iter()
            .map(|p| {
                let value = if mask_secrets && p.secret {
                    REDACTED.to_string()
                } else if p.opaque || mode == EncodingMode::Uniform {
                    urlencoding::encode(&p.value).into_owned()
                } else {
                    p.value.clone()
                };
                format!("{}={}", p.key, value)
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn join_url(base_url: &str, query: &str) -> String {
    let separator = if !base_url.contains('?') {
        "?"
    } else if base_url.ends_with('?') || base_url.ends_with('&') {
        ""
    } else {
        "&"
    };
    format!("{}{}{}", base_url, separator, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: &str = "test-key";

    fn keys(plan: &QueryPlan) -> Vec<&'static str> {
        plan.pairs().iter().map(|p| p.key).collect()
    }

    fn user(name: &str) -> RequestParams {
        RequestParams::new().with(USERNAME, name)
    }

    #[test]
    fn test_query_shapes_per_kind() {
        let cases = [
            (RequestKind::Profile, "key=test-key&username=tiktok"),
            (RequestKind::FullProfile, "key=test-key&username=tiktok&type=full"),
            (RequestKind::Stories, "key=test-key&username=tiktok&type=stories"),
            (RequestKind::Domain, "key=test-key&type=domain&username=tiktok"),
            (
                RequestKind::Following,
                "key=test-key&username=tiktok&type=following&limit=100",
            ),
            (
                RequestKind::AccountInfo,
                "key=test-key&type=account_info&username=tiktok",
            ),
        ];

        for (kind, expected) in cases {
            let plan = QueryPlan::build(kind, KEY, &user("tiktok")).unwrap();
            assert_eq!(plan.to_query_string(EncodingMode::Legacy), expected, "{kind}");
            assert_eq!(plan.to_query_string(EncodingMode::Uniform), expected, "{kind}");
        }
    }

    #[test]
    fn test_profile_never_has_type() {
        let plan = QueryPlan::build(RequestKind::Profile, KEY, &user("tiktok")).unwrap();
        assert_eq!(plan.get(TYPE_PARAM), None);
        assert_eq!(keys(&plan), vec![KEY_PARAM, USERNAME]);
    }

    #[test]
    fn test_other_kinds_always_have_type() {
        for kind in RequestKind::ALL {
            if kind == RequestKind::Profile {
                continue;
            }
            let params = user("tiktok").with(VIDEO_URL, "https://vt.tiktok.com/ZSyjwpsm5/");
            let plan = QueryPlan::build(kind, KEY, &params).unwrap();
            assert_eq!(plan.get(TYPE_PARAM), kind.type_value(), "{kind}");
            assert_eq!(plan.get(KEY_PARAM), Some(KEY), "{kind}");
        }
    }

    #[test]
    fn test_following_limit() {
        let plan = QueryPlan::build(RequestKind::Following, KEY, &user("tiktok")).unwrap();
        assert_eq!(plan.get(LIMIT), Some("100"));

        let plan = QueryPlan::build(
            RequestKind::Following,
            KEY,
            &user("tiktok").with(LIMIT, ""),
        )
        .unwrap();
        assert_eq!(plan.get(LIMIT), Some("100"));

        let plan = QueryPlan::build(
            RequestKind::Following,
            KEY,
            &user("tiktok").with(LIMIT, "full"),
        )
        .unwrap();
        assert_eq!(plan.get(LIMIT), Some("full"));
        assert!(plan
            .to_query_string(EncodingMode::Legacy)
            .ends_with("&limit=full"));
    }

    #[test]
    fn test_comments_video_url_always_encoded() {
        let params = RequestParams::new().with(VIDEO_URL, "https://vt.tiktok.com/ZSyjwpsm5/");
        let plan = QueryPlan::build(RequestKind::Comments, KEY, &params).unwrap();

        let expected =
            "key=test-key&type=comments&video_url=https%3A%2F%2Fvt.tiktok.com%2FZSyjwpsm5%2F";
        assert_eq!(plan.to_query_string(EncodingMode::Legacy), expected);
        assert_eq!(plan.to_query_string(EncodingMode::Uniform), expected);
        assert_eq!(plan.get(USERNAME), None);
    }

    #[test]
    fn test_comments_filter_username() {
        let params = RequestParams::new()
            .with(VIDEO_URL, "https://vt.tiktok.com/x/")
            .with(USERNAME, "khaby.lame");
        let plan = QueryPlan::build(RequestKind::Comments, KEY, &params).unwrap();
        assert_eq!(keys(&plan), vec![KEY_PARAM, TYPE_PARAM, VIDEO_URL, USERNAME]);
        assert!(plan
            .to_query_string(EncodingMode::Legacy)
            .ends_with("&username=khaby.lame"));

        // Whitespace-only filter is treated as absent
        let params = RequestParams::new()
            .with(VIDEO_URL, "https://vt.tiktok.com/x/")
            .with(USERNAME, "  ");
        let plan = QueryPlan::build(RequestKind::Comments, KEY, &params).unwrap();
        assert_eq!(plan.get(USERNAME), None);
    }

    #[test]
    fn test_missing_required_fields() {
        for kind in RequestKind::ALL {
            for blank in [None, Some(""), Some("   "), Some("\t\n")] {
                let params = match blank {
                    Some(v) => RequestParams::new().with(USERNAME, v).with(VIDEO_URL, v),
                    None => RequestParams::new(),
                };
                let err = QueryPlan::build(kind, KEY, &params).unwrap_err();
                let expected_field = if kind == RequestKind::Comments {
                    VIDEO_URL
                } else {
                    USERNAME
                };
                match err {
                    DispatchError::MissingRequiredField { kind: k, field } => {
                        assert_eq!(k, kind);
                        assert_eq!(field, expected_field);
                    }
                    other => panic!("unexpected error: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_required_values_not_trimmed() {
        let plan = QueryPlan::build(RequestKind::Profile, KEY, &user(" tiktok ")).unwrap();
        assert_eq!(plan.get(USERNAME), Some(" tiktok "));
    }

    #[test]
    fn test_encoding_modes_differ_on_reserved_chars() {
        let plan = QueryPlan::build(RequestKind::Profile, KEY, &user("a&b=c d")).unwrap();
        assert_eq!(
            plan.to_query_string(EncodingMode::Legacy),
            "key=test-key&username=a&b=c d"
        );
        assert_eq!(
            plan.to_query_string(EncodingMode::Uniform),
            "key=test-key&username=a%26b%3Dc%20d"
        );
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let params = user("tiktok").with("cursor", "42");
        let plan = QueryPlan::build(RequestKind::Stories, KEY, &params).unwrap();
        assert_eq!(plan.get("cursor"), None);
        assert_eq!(plan.pairs().len(), 3);
    }

    #[test]
    fn test_redaction_hides_key() {
        let plan = QueryPlan::build(RequestKind::Domain, "s3cr3t", &user("tiktok")).unwrap();
        let redacted = plan.to_redacted_url("https://api.example.test/", EncodingMode::Uniform);
        assert_eq!(
            redacted,
            "https://api.example.test/?key=***&type=domain&username=tiktok"
        );
        assert!(!redacted.contains("s3cr3t"));
    }

    #[test]
    fn test_join_url_respects_existing_query() {
        assert_eq!(join_url("https://h/", "a=1"), "https://h/?a=1");
        assert_eq!(join_url("https://h/?v=2", "a=1"), "https://h/?v=2&a=1");
        assert_eq!(join_url("https://h/?", "a=1"), "https://h/?a=1");
    }

    #[test]
    fn test_param_lists() {
        assert_eq!(required_params(RequestKind::Comments), vec![VIDEO_URL]);
        assert_eq!(optional_params(RequestKind::Comments), vec![USERNAME]);
        assert_eq!(required_params(RequestKind::Following), vec![USERNAME]);
        assert_eq!(optional_params(RequestKind::Following), vec![LIMIT]);
        assert!(optional_params(RequestKind::Profile).is_empty());
    }

    proptest! {
        #[test]
        fn uniform_encoding_round_trips(name in "\\PC{1,24}") {
            prop_assume!(!name.trim().is_empty());

            let plan = QueryPlan::build(RequestKind::Profile, KEY, &user(&name)).unwrap();
            let url = plan.to_url("https://api.example.test/", EncodingMode::Uniform);
            let parsed = reqwest::Url::parse(&url).unwrap();
            let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

            prop_assert_eq!(pairs.len(), 2);
            prop_assert_eq!(&pairs[0], &(KEY_PARAM.to_string(), KEY.to_string()));
            prop_assert_eq!(&pairs[1], &(USERNAME.to_string(), name));
        }
    }
}
