//! Certificate issuance gate and public verification.
//!
//! A certificate exists for `(event, subject)` only once the event is
//! COMPLETED and the subject was marked present. Its content hash is a
//! SHA-256 digest over the event, the subject, the issuance instant captured
//! at first issuance and a fixed salt; the lower-case hex digest is the only
//! public verification key.
//!
//! Issuance is idempotent. The pair lookup and the insert happen under one
//! lock with no await point between them, so concurrent callers for the same
//! pair all observe a single stored certificate, and dropping an issuance
//! future never leaves a partial record behind.

use crate::approval::ApprovalEngine;
use crate::audit::AuditLog;
use crate::error::{DomainError, Result, TargetType};
use crate::metrics;
use crate::types::{AuditAction, AuditEntry, Certificate, CertificateView, Event, EventStatus};
use certifytrack_core::environment::{AuthorityProvider, Clock};
use certifytrack_core::ids::{ActorId, CertificateId, EventId, SubjectId};
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const DIGEST_DOMAIN: &str = "certifytrack.certificate.v1";
const DIGEST_HEX_LEN: usize = 64;
const NUMBER_DIGEST_CHARS: usize = 10;

/// Result of an issuance request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Issuance {
    /// A certificate was created by this call
    Issued(Certificate),
    /// The pair already had a certificate; it is returned unchanged
    Existing(Certificate),
}

impl Issuance {
    /// The certificate, new or existing.
    #[must_use]
    pub const fn certificate(&self) -> &Certificate {
        match self {
            Self::Issued(certificate) | Self::Existing(certificate) => certificate,
        }
    }

    /// Take the certificate.
    #[must_use]
    pub fn into_certificate(self) -> Certificate {
        match self {
            Self::Issued(certificate) | Self::Existing(certificate) => certificate,
        }
    }

    /// Whether this call created it.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        matches!(self, Self::Issued(_))
    }
}

#[derive(Debug, Default)]
struct Registry {
    by_pair: HashMap<(EventId, SubjectId), CertificateId>,
    by_hash: HashMap<String, CertificateId>,
    certificates: HashMap<CertificateId, Certificate>,
}

/// Issues, verifies and revokes certificates.
pub struct CertificateRegistry {
    salt: String,
    prefix: String,
    reasons: ApprovalEngine,
    authority: Arc<dyn AuthorityProvider>,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditLog>,
    state: Mutex<Registry>,
}

impl CertificateRegistry {
    /// Creates a new `CertificateRegistry`
    ///
    /// `reasons` validates revocation reasons with the same rules as
    /// rejection reasons.
    #[must_use]
    pub fn new(
        salt: impl Into<String>,
        prefix: impl Into<String>,
        reasons: ApprovalEngine,
        authority: Arc<dyn AuthorityProvider>,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            salt: salt.into(),
            prefix: prefix.into(),
            reasons,
            authority,
            clock,
            audit,
            state: Mutex::new(Registry::default()),
        }
    }

    fn digest(&self, event_id: EventId, subject: &SubjectId, issued_at: DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "{DIGEST_DOMAIN}\n{event_id}\n{subject}\n{}\n{}",
                issued_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                self.salt
            )
            .as_bytes(),
        );
        hex::encode(hasher.finalize())
    }

    fn number(&self, content_hash: &str, issued_at: DateTime<Utc>) -> String {
        let short: String = content_hash.chars().take(NUMBER_DIGEST_CHARS).collect();
        format!(
            "{}-{}-{}",
            self.prefix,
            issued_at.format("%Y"),
            short.to_ascii_uppercase()
        )
    }

    /// Issue the certificate for `subject` at `event`, or return the one
    /// already issued.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::PreconditionFailed`] unless the event is
    /// COMPLETED and `subject` is a present participant.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id))]
    pub async fn issue(&self, event: &Event, subject: &SubjectId) -> Result<Issuance> {
        if event.status != EventStatus::Completed {
            return Err(DomainError::PreconditionFailed(format!(
                "event {} is {}; certificates are issued only after completion",
                event.id, event.status
            )));
        }
        if !event.attended(subject) {
            return Err(DomainError::PreconditionFailed(format!(
                "{subject} was not marked present at event {}",
                event.id
            )));
        }

        let mut state = self.state.lock().await;
        let key = (event.id, subject.clone());
        if let Some(existing) = state
            .by_pair
            .get(&key)
            .and_then(|id| state.certificates.get(id))
        {
            tracing::debug!(certificate = %existing.number, "Certificate already issued");
            return Ok(Issuance::Existing(existing.clone()));
        }

        let issued_at = self.clock.now();
        let content_hash = self.digest(event.id, subject, issued_at);
        let certificate = Certificate {
            id: CertificateId::new(),
            event_id: event.id,
            subject_id: subject.clone(),
            number: self.number(&content_hash, issued_at),
            content_hash,
            issued_at,
            revoked: false,
            revocation_reason: None,
            revoked_at: None,
        };
        state.by_pair.insert(key, certificate.id);
        state
            .by_hash
            .insert(certificate.content_hash.clone(), certificate.id);
        state.certificates.insert(certificate.id, certificate.clone());
        drop(state);

        metrics::record_certificate_issued();
        tracing::info!(certificate = %certificate.number, %subject, "Certificate issued");
        Ok(Issuance::Issued(certificate))
    }

    /// Public verification by digest.
    ///
    /// Case and surrounding whitespace are ignored. Revoked certificates are
    /// still returned, flagged as revoked.
    ///
    /// # Errors
    ///
    /// Returns the uniform [`DomainError::certificate_not_found`] for any
    /// miss, whether the digest is malformed or was never issued.
    pub async fn verify(&self, content_hash: &str) -> Result<CertificateView> {
        let normalized = content_hash.trim().to_ascii_lowercase();
        if normalized.len() != DIGEST_HEX_LEN || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::certificate_not_found());
        }
        let state = self.state.lock().await;
        state
            .by_hash
            .get(&normalized)
            .and_then(|id| state.certificates.get(id))
            .map(Certificate::public_view)
            .ok_or_else(DomainError::certificate_not_found)
    }

    /// Revoke a certificate.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Validation`] for a missing or short reason
    /// - [`DomainError::Unauthorized`] without certificate authority
    /// - [`DomainError::NotFound`] for an unknown digest
    /// - [`DomainError::InvalidTransition`] if already revoked
    #[tracing::instrument(skip(self, reason))]
    pub async fn revoke(&self, content_hash: &str, actor: &ActorId, reason: &str) -> Result<Certificate> {
        let reason = self.reasons.validate_reason(reason)?;
        if !self.authority.can_manage_certificates(actor) {
            return Err(DomainError::Unauthorized(format!(
                "{actor} may not revoke certificates"
            )));
        }

        let normalized = content_hash.trim().to_ascii_lowercase();
        let now = self.clock.now();
        let revoked = {
            let mut state = self.state.lock().await;
            let id = state
                .by_hash
                .get(&normalized)
                .copied()
                .ok_or_else(DomainError::certificate_not_found)?;
            let certificate = state
                .certificates
                .get_mut(&id)
                .ok_or_else(DomainError::certificate_not_found)?;
            if certificate.revoked {
                tracing::warn!(certificate = %certificate.number, "Certificate already revoked");
                return Err(DomainError::invalid_transition(
                    TargetType::Certificate,
                    "REVOKED",
                    "revoke",
                ));
            }
            certificate.revoked = true;
            certificate.revocation_reason = Some(reason.clone());
            certificate.revoked_at = Some(now);
            certificate.clone()
        };

        self.audit
            .record(
                AuditEntry::new(
                    actor.clone(),
                    AuditAction::Revoke,
                    TargetType::Certificate,
                    revoked.id,
                    now,
                )
                .with_statuses(Some("ISSUED"), "REVOKED")
                .with_reason(Some(reason)),
            )
            .await;
        metrics::record_certificate_revoked();
        tracing::info!(certificate = %revoked.number, "Certificate revoked");
        Ok(revoked)
    }

    /// The certificate of one pair, if issued.
    pub async fn certificate_for(&self, event_id: EventId, subject: &SubjectId) -> Option<Certificate> {
        let state = self.state.lock().await;
        state
            .by_pair
            .get(&(event_id, subject.clone()))
            .and_then(|id| state.certificates.get(id))
            .cloned()
    }

    /// Certificates of one event, ordered by subject.
    pub async fn for_event(&self, event_id: EventId) -> Vec<Certificate> {
        let state = self.state.lock().await;
        let mut found: Vec<Certificate> = state
            .certificates
            .values()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        found
    }
}
