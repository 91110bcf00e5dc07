//! Class resolution: which class/section a student sat in during a given
//! academic year, reconstructed from promotion history.
//!
//! Promotions are stamped with the year they happened but bill from the
//! following year, so a query looks at the target year and the one before it.
//! Precedence (first match wins):
//!   1. revert in the target year        → revert's `to` class
//!   2. live promotion in the target year → promotion's `from` class
//!   3. revert in the previous year       → revert's `to` class
//!   4. live promotion in the previous year → promotion's `to` class
//!   5. target year in the future         → not in the academic year
//!   6. otherwise                         → the student's current class

use crate::{
    academic_year::AcademicYear,
    model::{PromotionRecord, PromotionType, Student},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub display_class: Option<String>,
    pub display_section: Option<String>,
    pub is_in_academic_year: bool,
}

impl Resolution {
    fn in_year(class: &str, section: &str) -> Self {
        Self {
            display_class: Some(class.to_string()),
            display_section: Some(section.to_string()),
            is_in_academic_year: true,
        }
    }

    fn not_in_year() -> Self {
        Self {
            display_class: None,
            display_section: None,
            is_in_academic_year: false,
        }
    }

    /// Class and section, present only when the student was in the year.
    pub fn class_section(&self) -> Option<(&str, &str)> {
        if !self.is_in_academic_year {
            return None;
        }
        match (&self.display_class, &self.display_section) {
            (Some(c), Some(s)) => Some((c.as_str(), s.as_str())),
            _ => None,
        }
    }
}

/// Resolve `student`'s class/section for `target`. `current` is the academic
/// year containing "today" and decides whether `target` lies in the future.
pub fn resolve(student: &Student, target: AcademicYear, current: AcademicYear) -> Resolution {
    let history = &student.promotion_history;

    if let Some(r) = find_revert(history, target) {
        return Resolution::in_year(&r.to_class, &r.to_section);
    }
    if let Some(p) = find_live_promotion(history, target) {
        return Resolution::in_year(&p.from_class, &p.from_section);
    }

    if let Some(previous) = target.previous() {
        if let Some(r) = find_revert(history, previous) {
            return Resolution::in_year(&r.to_class, &r.to_section);
        }
        if let Some(p) = find_live_promotion(history, previous) {
            return Resolution::in_year(&p.to_class, &p.to_section);
        }
    }

    if target.is_after(&current) {
        log::debug!(
            "student={} year={target}: no promotion evidence for a future year",
            student.id
        );
        return Resolution::not_in_year();
    }

    Resolution::in_year(&student.current_class, &student.current_section)
}

fn find_revert(history: &[PromotionRecord], year: AcademicYear) -> Option<&PromotionRecord> {
    history
        .iter()
        .find(|r| r.academic_year == year && r.promotion_type == PromotionType::Reverted)
}

fn find_live_promotion(history: &[PromotionRecord], year: AcademicYear) -> Option<&PromotionRecord> {
    history.iter().find(|r| {
        r.academic_year == year && r.promotion_type == PromotionType::Promoted && !r.reverted
    })
}
