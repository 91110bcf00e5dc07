//! Class resolution precedence across promotion histories.

use feeledger_core::{
    academic_year::AcademicYear,
    class_resolver::resolve,
    model::{PromotionRecord, PromotionType, Student},
};

fn year(label: &str) -> AcademicYear {
    AcademicYear::parse(label).unwrap()
}

/// "Now" for every test: the 2024-2025 academic year.
fn current() -> AcademicYear {
    year("2024-2025")
}

fn student(class: &str, section: &str, history: Vec<PromotionRecord>) -> Student {
    Student {
        id: "S-1".into(),
        name: Some("Test Student".into()),
        current_class: class.into(),
        current_section: section.into(),
        promotion_history: history,
    }
}

fn promoted(y: &str, from: (&str, &str), to: (&str, &str), reverted: bool) -> PromotionRecord {
    PromotionRecord {
        academic_year: year(y),
        promotion_type: PromotionType::Promoted,
        from_class: from.0.into(),
        from_section: from.1.into(),
        to_class: to.0.into(),
        to_section: to.1.into(),
        reverted,
    }
}

fn reverted(y: &str, from: (&str, &str), to: (&str, &str)) -> PromotionRecord {
    PromotionRecord {
        academic_year: year(y),
        promotion_type: PromotionType::Reverted,
        from_class: from.0.into(),
        from_section: from.1.into(),
        to_class: to.0.into(),
        to_section: to.1.into(),
        reverted: false,
    }
}

fn class_of(s: &Student, y: &str) -> Option<(String, String)> {
    let r = resolve(s, year(y), current());
    assert!(r.is_in_academic_year, "expected {y} to be in the academic year");
    Some((r.display_class?, r.display_section?))
}

fn cs(c: &str, s: &str) -> Option<(String, String)> {
    Some((c.to_string(), s.to_string()))
}

#[test]
fn revert_wins_over_promotion_in_same_year() {
    // Promotion listed first, revert second: the revert rule still applies.
    let s = student(
        "6",
        "A",
        vec![
            promoted("2023-2024", ("5", "A"), ("6", "A"), false),
            reverted("2023-2024", ("6", "A"), ("5", "B")),
        ],
    );
    assert_eq!(class_of(&s, "2023-2024"), cs("5", "B"));
}

#[test]
fn promotion_carries_into_the_following_year() {
    let s = student(
        "6",
        "A",
        vec![promoted("2023-2024", ("5", "A"), ("6", "A"), false)],
    );
    assert_eq!(class_of(&s, "2023-2024"), cs("5", "A"));
    assert_eq!(class_of(&s, "2024-2025"), cs("6", "A"));
}

#[test]
fn revert_in_previous_year_applies_to_target() {
    let s = student(
        "7",
        "C",
        vec![
            promoted("2023-2024", ("5", "A"), ("6", "A"), true),
            reverted("2023-2024", ("6", "A"), ("5", "A")),
        ],
    );
    assert_eq!(class_of(&s, "2024-2025"), cs("5", "A"));
}

#[test]
fn reverted_promotion_alone_does_not_carry_forward() {
    // Flagged as reverted but with no revert record: rules 2 and 4 skip it.
    let s = student(
        "4",
        "D",
        vec![promoted("2023-2024", ("4", "D"), ("5", "D"), true)],
    );
    assert_eq!(class_of(&s, "2023-2024"), cs("4", "D"));
    assert_eq!(class_of(&s, "2024-2025"), cs("4", "D"));
}

#[test]
fn target_year_promotion_beats_previous_year_promotion() {
    let s = student(
        "8",
        "A",
        vec![
            promoted("2023-2024", ("6", "A"), ("7", "A"), false),
            promoted("2024-2025", ("7", "A"), ("8", "A"), false),
        ],
    );
    // 2024-2025 has its own promotion: billed in the class held before it.
    assert_eq!(class_of(&s, "2024-2025"), cs("7", "A"));
    // The 2024-2025 promotion carries into 2025-2026 even though it is future.
    assert_eq!(class_of(&s, "2025-2026"), cs("8", "A"));
}

#[test]
fn far_future_year_without_records_is_not_in_academic_year() {
    let s = student(
        "6",
        "A",
        vec![promoted("2023-2024", ("5", "A"), ("6", "A"), false)],
    );
    let r = resolve(&s, year("2030-2031"), current());
    assert!(!r.is_in_academic_year);
    assert_eq!(r.display_class, None);
    assert_eq!(r.display_section, None);
    assert_eq!(r.class_section(), None);
}

#[test]
fn next_year_without_promotion_is_not_in_academic_year() {
    let s = student("3", "B", Vec::new());
    let r = resolve(&s, year("2025-2026"), current());
    assert!(!r.is_in_academic_year);
}

#[test]
fn no_history_falls_back_to_current_class_for_past_and_present() {
    let s = student("3", "B", Vec::new());
    assert_eq!(class_of(&s, "2024-2025"), cs("3", "B"));
    assert_eq!(class_of(&s, "2018-2019"), cs("3", "B"));
}

#[test]
fn unrelated_years_do_not_influence_resolution() {
    // A promotion two years back is outside the one-year lookback.
    let s = student(
        "9",
        "A",
        vec![promoted("2021-2022", ("7", "A"), ("8", "A"), false)],
    );
    assert_eq!(class_of(&s, "2023-2024"), cs("9", "A"));
}

#[test]
fn history_order_does_not_change_precedence() {
    let forward = student(
        "6",
        "A",
        vec![
            promoted("2023-2024", ("5", "A"), ("6", "A"), true),
            reverted("2023-2024", ("6", "A"), ("5", "A")),
        ],
    );
    let mut backward = forward.clone();
    backward.promotion_history.reverse();

    for y in ["2023-2024", "2024-2025"] {
        assert_eq!(
            resolve(&forward, year(y), current()),
            resolve(&backward, year(y), current()),
            "resolution for {y} depends on history order"
        );
    }
}
