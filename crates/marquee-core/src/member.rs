//! # Member Attributes
//!
//! The slice of a member profile the booking core needs: standing and
//! ticket-type eligibility. Identity, authentication and profile CRUD
//! live outside this workspace.
//!
//! ## Eligibility Table
//! ```text
//! ┌──────────┬──────────────────────────────────────────┐
//! │ Ticket   │ Predicate                                │
//! ├──────────┼──────────────────────────────────────────┤
//! │ ADULT    │ always                                   │
//! │ CHILD    │ age < 12                                 │
//! │ SENIOR   │ age >= 65, or holds a SENIOR card        │
//! │ STUDENT  │ holds a STUDENT card                     │
//! └──────────┴──────────────────────────────────────────┘
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::pricing::TicketType;

/// Upper bound (exclusive) for CHILD tickets.
pub const CHILD_MAX_AGE: u32 = 12;

/// Lower bound (inclusive) for SENIOR tickets.
pub const SENIOR_MIN_AGE: u32 = 65;

/// Citizen card held by a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
    Regular,
    Student,
    Senior,
    Disability,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MemberProfile {
    pub member_id: String,
    pub active: bool,
    pub verified: bool,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    pub card_type: Option<CardType>,
}

type EligibilityRule = fn(&MemberProfile, NaiveDate) -> bool;

const ELIGIBILITY: [(TicketType, EligibilityRule); 4] = [
    (TicketType::Adult, always),
    (TicketType::Child, is_child),
    (TicketType::Senior, is_senior),
    (TicketType::Student, is_student),
];

fn always(_: &MemberProfile, _: NaiveDate) -> bool {
    true
}

fn is_child(m: &MemberProfile, today: NaiveDate) -> bool {
    m.age_on(today).is_some_and(|age| age < CHILD_MAX_AGE)
}

fn is_senior(m: &MemberProfile, today: NaiveDate) -> bool {
    m.card_type == Some(CardType::Senior) || m.age_on(today).is_some_and(|age| age >= SENIOR_MIN_AGE)
}

fn is_student(m: &MemberProfile, _: NaiveDate) -> bool {
    m.card_type == Some(CardType::Student)
}

impl MemberProfile {
    /// A member may book once active and verified.
    #[inline]
    pub fn can_book(&self) -> bool {
        self.active && self.verified
    }

    /// Whole years between birth date and `today`.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    pub fn is_eligible_for(&self, ticket_type: TicketType, today: NaiveDate) -> bool {
        ELIGIBILITY
            .iter()
            .find(|(t, _)| *t == ticket_type)
            .is_some_and(|(_, rule)| rule(self, today))
    }
}
