//! Sticky variant assignment.
//!
//! The resolver is the seam between the rotation counters, the token
//! codec, and the impression recorder. A visitor presenting a valid token
//! keeps their variant (idempotent repeat visits); everyone else gets the
//! next variant in rotation, a freshly signed token, and exactly one
//! impression record.

use crate::recorder::ImpressionRecorder;
use crate::rotation::RotationSet;
use crate::token::AssignmentCodec;
use crate::types::SurveyFamily;
use std::sync::Arc;
use tracing::{debug, error};

/// Default language when the request carries none.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub variant: String,
    pub language: String,
    /// Cookie name for this (family, language) slot.
    pub cookie_name: String,
    /// Token for the caller to persist. `None` on a sticky hit, where the
    /// client already holds a valid one.
    pub token: Option<String>,
}

impl Assignment {
    pub fn is_fresh(&self) -> bool {
        self.token.is_some()
    }
}

pub struct AssignmentResolver {
    rotation: RotationSet,
    codec: AssignmentCodec,
    impressions: Arc<dyn ImpressionRecorder>,
}

impl AssignmentResolver {
    pub fn new(
        rotation: RotationSet,
        codec: AssignmentCodec,
        impressions: Arc<dyn ImpressionRecorder>,
    ) -> Self {
        Self {
            rotation,
            codec,
            impressions,
        }
    }

    /// Resolve the variant for a visitor.
    ///
    /// `existing_token` is whatever the client presented for this slot's
    /// cookie, if anything. Tampered or stale tokens decode as absent and
    /// fall through to the fresh-assignment path; they are never an error.
    pub fn resolve(
        &self,
        family: SurveyFamily,
        language: Option<&str>,
        existing_token: Option<&str>,
    ) -> Assignment {
        let language = match language {
            Some(lang) if !lang.is_empty() => lang,
            _ => DEFAULT_LANGUAGE,
        };
        let cookie_name = format!("{}-{}", family.cookie_prefix(), language);

        if let Some(token) = existing_token {
            if let Some(variant) = self.codec.decode(&cookie_name, token) {
                // The variant must still be in the configured list; a
                // validly signed token for a retired variant re-enters
                // rotation instead.
                if self.rotation.catalog().contains(family, &variant) {
                    metrics::counter!("assignment.sticky_hits").increment(1);
                    return Assignment {
                        variant,
                        language: language.to_string(),
                        cookie_name,
                        token: None,
                    };
                }
                debug!(%family, variant = %variant, "Token variant no longer in catalog, reassigning");
            }
        }

        let variant = self.rotation.next(family).to_string();
        let token = self.codec.encode(&cookie_name, &variant);
        metrics::counter!("assignment.fresh").increment(1);

        // Best-effort: impression logging must never block assignment, and
        // runs outside any rotation lock.
        if let Err(e) = self.impressions.record_impression(&variant, language) {
            metrics::counter!("assignment.impression_errors").increment(1);
            error!(error = %e, survey = %variant, language = %language, "Failed to record impression");
        }

        Assignment {
            variant,
            language: language.to_string(),
            cookie_name,
            token: Some(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::token::CookieKey;
    use crate::types::SurveyCatalog;
    use parking_lot::Mutex;

    /// Capturing recorder; can be flipped to fail every write.
    #[derive(Default)]
    struct RecordingSink {
        impressions: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl ImpressionRecorder for RecordingSink {
        fn record_impression(&self, survey_name: &str, language: &str) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Backend("sink offline".into()));
            }
            self.impressions
                .lock()
                .push((survey_name.to_string(), language.to_string()));
            Ok(())
        }
    }

    fn make_resolver(sink: Arc<RecordingSink>) -> AssignmentResolver {
        let catalog = Arc::new(SurveyCatalog::default());
        AssignmentResolver::new(
            RotationSet::new(catalog),
            AssignmentCodec::new(CookieKey::generate()),
            sink,
        )
    }

    #[test]
    fn test_first_visit_draws_and_records_one_impression() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = make_resolver(sink.clone());

        let assignment = resolver.resolve(SurveyFamily::Feedback, Some("en"), None);
        assert_eq!(assignment.variant, "customer-feedback-a");
        assert!(assignment.is_fresh());
        assert_eq!(assignment.cookie_name, "feedbackAssignment-en");

        let impressions = sink.impressions.lock();
        assert_eq!(impressions.len(), 1);
        assert_eq!(impressions[0], ("customer-feedback-a".into(), "en".into()));
    }

    #[test]
    fn test_repeat_visit_is_sticky_and_silent() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = make_resolver(sink.clone());

        let first = resolver.resolve(SurveyFamily::Feedback, Some("en"), None);
        let token = first.token.clone().unwrap();

        // Advance rotation via other visitors so stickiness is observable.
        resolver.resolve(SurveyFamily::Feedback, Some("en"), None);
        resolver.resolve(SurveyFamily::Feedback, Some("en"), None);

        let repeat = resolver.resolve(SurveyFamily::Feedback, Some("en"), Some(&token));
        assert_eq!(repeat.variant, first.variant);
        assert!(!repeat.is_fresh());
        // Sticky hits log no impressions: still 3 from the fresh draws.
        assert_eq!(sink.impressions.lock().len(), 3);
    }

    #[test]
    fn test_undecodable_token_triggers_fresh_assignment() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = make_resolver(sink.clone());

        let assignment =
            resolver.resolve(SurveyFamily::Poll, Some("en"), Some("mangled.cookie.value"));
        assert_eq!(assignment.variant, "new-feature-poll-a");
        assert!(assignment.is_fresh());
        assert_eq!(sink.impressions.lock().len(), 1);
    }

    #[test]
    fn test_language_defaults_to_en() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = make_resolver(sink.clone());

        let a = resolver.resolve(SurveyFamily::Employee, None, None);
        assert_eq!(a.language, "en");
        let b = resolver.resolve(SurveyFamily::Employee, Some(""), None);
        assert_eq!(b.language, "en");
        assert_eq!(a.cookie_name, "employeeSurveyAssignment-en");
        assert_eq!(a.cookie_name, b.cookie_name);
    }

    #[test]
    fn test_languages_hold_independent_assignments() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = make_resolver(sink);

        let en = resolver.resolve(SurveyFamily::Feedback, Some("en"), None);
        let fr = resolver.resolve(SurveyFamily::Feedback, Some("fr"), None);
        // Same rotation: the French visitor gets the next variant in line.
        assert_eq!(en.variant, "customer-feedback-a");
        assert_eq!(fr.variant, "customer-feedback-b");
        assert_ne!(en.cookie_name, fr.cookie_name);

        // An English token presented on the French slot is absent there.
        let token = en.token.unwrap();
        let cross = resolver.resolve(SurveyFamily::Feedback, Some("fr"), Some(&token));
        assert!(cross.is_fresh());
    }

    #[test]
    fn test_token_for_other_family_is_absent() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = make_resolver(sink);

        let feedback = resolver.resolve(SurveyFamily::Feedback, Some("en"), None);
        let token = feedback.token.unwrap();
        let poll = resolver.resolve(SurveyFamily::Poll, Some("en"), Some(&token));
        assert!(poll.is_fresh());
        assert_eq!(poll.variant, "new-feature-poll-a");
    }

    #[test]
    fn test_impression_failure_does_not_block_assignment() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let resolver = make_resolver(sink);

        let assignment = resolver.resolve(SurveyFamily::Feedback, Some("en"), None);
        assert_eq!(assignment.variant, "customer-feedback-a");
        assert!(assignment.is_fresh());
    }

    #[test]
    fn test_retired_variant_token_reenters_rotation() {
        // Token validly signed for a variant that is no longer configured.
        let sink = Arc::new(RecordingSink::default());
        let codec = AssignmentCodec::new(CookieKey::generate());
        let catalog = Arc::new(SurveyCatalog::default());
        let resolver =
            AssignmentResolver::new(RotationSet::new(catalog), codec.clone(), sink.clone());

        let stale = codec.encode("feedbackAssignment-en", "customer-feedback-z");
        let assignment = resolver.resolve(SurveyFamily::Feedback, Some("en"), Some(&stale));
        assert!(assignment.is_fresh());
        assert_eq!(assignment.variant, "customer-feedback-a");
        assert_eq!(sink.impressions.lock().len(), 1);
    }

    #[test]
    fn test_concurrent_first_visits_never_share_a_draw() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = Arc::new(make_resolver(sink));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let resolver = resolver.clone();
            handles.push(std::thread::spawn(move || {
                let mut variants = Vec::new();
                for _ in 0..50 {
                    variants.push(resolver.resolve(SurveyFamily::Poll, Some("en"), None).variant);
                }
                variants
            }));
        }

        let mut a = 0usize;
        let mut b = 0usize;
        for handle in handles {
            for variant in handle.join().unwrap() {
                match variant.as_str() {
                    "new-feature-poll-a" => a += 1,
                    "new-feature-poll-b" => b += 1,
                    other => panic!("unexpected variant {other}"),
                }
            }
        }
        assert_eq!(a, 100);
        assert_eq!(b, 100);
    }
}
