use chrono::{DateTime, Duration, Utc};

use super::types::{EligibilityReason, EligibilityVerdict, Visibility, VideoRecord};

/// Decides whether `video` should move to `target`. Total and pure: the
/// same inputs always give the same verdict.
///
/// Checks run in a fixed order so each ineligible video reports the first
/// rule it breaks. Age uses a closed bound: exactly `age_threshold` old is
/// eligible.
pub fn evaluate(
    video: &VideoRecord,
    now: DateTime<Utc>,
    age_threshold: Duration,
    target: Visibility,
) -> EligibilityVerdict {
    if !video.is_live {
        return EligibilityVerdict::ineligible(EligibilityReason::NotLive);
    }
    if video.visibility == target {
        return EligibilityVerdict::ineligible(EligibilityReason::AlreadyTargetVisibility);
    }
    if now.signed_duration_since(video.published_at) < age_threshold {
        return EligibilityVerdict::ineligible(EligibilityReason::TooYoung);
    }
    EligibilityVerdict::eligible()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap()
    }

    fn video(age: Duration, visibility: Visibility, is_live: bool) -> VideoRecord {
        VideoRecord {
            id: "vid".into(),
            channel_id: "UCxxxxxxxxxxxxxxxxxxxxxx".into(),
            title: None,
            visibility,
            published_at: now() - age,
            is_live,
        }
    }

    const TARGET: Visibility = Visibility::Unlisted;

    #[test]
    fn old_public_stream_is_eligible() {
        let v = video(Duration::hours(30), Visibility::Public, true);
        assert_eq!(evaluate(&v, now(), Duration::hours(24), TARGET), EligibilityVerdict::eligible());
    }

    #[test]
    fn exactly_at_threshold_is_eligible() {
        let v = video(Duration::hours(24), Visibility::Public, true);
        assert!(evaluate(&v, now(), Duration::hours(24), TARGET).eligible);

        let just_under = video(Duration::hours(24) - Duration::seconds(1), Visibility::Public, true);
        let verdict = evaluate(&just_under, now(), Duration::hours(24), TARGET);
        assert_eq!(verdict.reason, EligibilityReason::TooYoung);
        assert!(!verdict.eligible);
    }

    #[test]
    fn each_violated_rule_reports_its_reason() {
        let threshold = Duration::hours(24);
        let cases = [
            (video(Duration::hours(48), Visibility::Public, false), EligibilityReason::NotLive),
            (video(Duration::hours(48), Visibility::Unlisted, true), EligibilityReason::AlreadyTargetVisibility),
            (video(Duration::hours(10), Visibility::Public, true), EligibilityReason::TooYoung),
        ];
        for (v, reason) in cases {
            assert_eq!(evaluate(&v, now(), threshold, TARGET), EligibilityVerdict::ineligible(reason));
        }
    }

    #[test]
    fn verdict_holds_across_ages_and_visibilities() {
        let threshold = Duration::hours(24);
        let visibilities = [Visibility::Public, Visibility::Unlisted, Visibility::Private, Visibility::Unknown];
        for hours in [0i64, 1, 23, 24, 25, 72, 24 * 30] {
            for vis in visibilities {
                for live in [true, false] {
                    let v = video(Duration::hours(hours), vis, live);
                    let expect = live && vis != TARGET && hours >= 24;
                    let verdict = evaluate(&v, now(), threshold, TARGET);
                    assert_eq!(verdict.eligible, expect, "hours={hours} vis={vis} live={live}");
                    assert_eq!(verdict, evaluate(&v, now(), threshold, TARGET));
                }
            }
        }
    }

    #[test]
    fn future_timestamp_is_too_young() {
        let v = video(Duration::hours(-2), Visibility::Public, true);
        assert_eq!(evaluate(&v, now(), Duration::hours(1), TARGET).reason, EligibilityReason::TooYoung);
    }
}
