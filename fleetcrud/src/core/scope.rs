use uuid::Uuid;

/// The organization and actor an operation runs on behalf of.
///
/// Every query issued through [`CRUDResource`](super::CRUDResource) is filtered by
/// `organization_id`, and every insert has its tenant column forced to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Scope {
    pub organization_id: Uuid,
    pub actor_id: Uuid,
}

impl Scope {
    #[must_use]
    pub const fn new(organization_id: Uuid, actor_id: Uuid) -> Self {
        Self {
            organization_id,
            actor_id,
        }
    }
}
