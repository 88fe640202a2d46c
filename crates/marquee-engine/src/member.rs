//! # Member Directory
//!
//! Member identity lives outside the engine. The orchestrator only asks two
//! questions: is this member allowed to book, and may they buy this ticket
//! type.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use marquee_core::{MemberProfile, TicketType};

use crate::clock::Clock;
use crate::error::EngineResult;

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// `None` when the member is unknown.
    async fn is_active(&self, member_id: &str) -> EngineResult<Option<bool>>;

    async fn is_eligible_for_ticket_type(
        &self,
        member_id: &str,
        ticket_type: TicketType,
    ) -> EngineResult<bool>;
}

/// Directory backed by a map of profiles, judged with the core
/// eligibility table. Ages are taken on the clock's current date.
pub struct InMemoryMemberDirectory {
    members: RwLock<HashMap<String, MemberProfile>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMemberDirectory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        InMemoryMemberDirectory {
            members: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn upsert(&self, profile: MemberProfile) {
        self.members
            .write()
            .await
            .insert(profile.member_id.clone(), profile);
    }

    pub async fn remove(&self, member_id: &str) -> Option<MemberProfile> {
        self.members.write().await.remove(member_id)
    }
}

#[async_trait]
impl MemberDirectory for InMemoryMemberDirectory {
    async fn is_active(&self, member_id: &str) -> EngineResult<Option<bool>> {
        Ok(self
            .members
            .read()
            .await
            .get(member_id)
            .map(MemberProfile::can_book))
    }

    async fn is_eligible_for_ticket_type(
        &self,
        member_id: &str,
        ticket_type: TicketType,
    ) -> EngineResult<bool> {
        let today = self.clock.now().date_naive();
        Ok(self
            .members
            .read()
            .await
            .get(member_id)
            .is_some_and(|m| m.is_eligible_for(ticket_type, today)))
    }
}
