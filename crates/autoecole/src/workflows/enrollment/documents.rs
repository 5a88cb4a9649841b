use std::sync::Arc;

use super::domain::{required_documents, DocumentType, StudentId, UserRole};
use super::repository::{DocumentRepository, RepositoryError};

/// Checks that every document type required for a role has at least one
/// verified record on file. Gates enrollment approval only; an incomplete
/// set is a normal rejection path, not a fault.
pub struct DocumentGate {
    documents: Arc<dyn DocumentRepository>,
}

impl DocumentGate {
    pub fn new(documents: Arc<dyn DocumentRepository>) -> Self {
        Self { documents }
    }

    /// Required types without a verified record, in a stable order.
    pub fn missing_documents(
        &self,
        user_id: StudentId,
        role: UserRole,
    ) -> Result<Vec<DocumentType>, RepositoryError> {
        let verified = self.documents.verified_types(user_id)?;
        Ok(required_documents(role)
            .iter()
            .copied()
            .filter(|required| !verified.contains(required))
            .collect())
    }

    pub fn is_complete(&self, user_id: StudentId, role: UserRole) -> Result<bool, RepositoryError> {
        Ok(self.missing_documents(user_id, role)?.is_empty())
    }
}
