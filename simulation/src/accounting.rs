//! Crypto accounting
//!
//! The simulator does not compute signatures or key encapsulations; drivers
//! report the parameters of operations they performed (or pretend to have
//! performed) and the engine records them. These operations are independent
//! of routing and of peer online state.

use driftmesh_core::{AccountingError, PeerId, SimError};

use crate::engine::Simulation;
use crate::events::EventKind;

impl Simulation {
    fn accounted_member(&self, peer: &PeerId) -> Result<(), AccountingError> {
        if self.mesh_contains(peer) {
            Ok(())
        } else {
            Err(AccountingError::UnknownPeer(peer.clone()))
        }
    }

    fn record_accounting(&mut self, kind: EventKind) {
        let tick = self.tick();
        let rec = self.recorder_mut();
        let ctx = rec.child_of_root();
        rec.record(tick, &ctx, kind);
    }

    /// Record a post-quantum signature created by `signer`
    pub fn record_pq_signature(
        &mut self,
        signer: &PeerId,
        latency_us: u64,
        message_bytes: usize,
    ) -> Result<(), SimError> {
        self.accounted_member(signer)?;
        self.record_accounting(EventKind::PqSignature {
            signer: signer.clone(),
            latency_us,
            message_bytes,
        });
        Ok(())
    }

    /// Record a signature verification attempt
    pub fn record_pq_verification(
        &mut self,
        verifier: &PeerId,
        signer: &PeerId,
        latency_us: u64,
        success: bool,
    ) -> Result<(), SimError> {
        self.accounted_member(verifier)?;
        self.accounted_member(signer)?;
        self.record_accounting(EventKind::PqVerification {
            verifier: verifier.clone(),
            signer: signer.clone(),
            latency_us,
            success,
        });
        Ok(())
    }

    /// Record a KEM encapsulation performed by `initiator` toward `target`
    pub fn record_kem_encapsulation(
        &mut self,
        initiator: &PeerId,
        target: &PeerId,
        latency_us: u64,
    ) -> Result<(), SimError> {
        self.accounted_member(initiator)?;
        self.accounted_member(target)?;
        self.record_accounting(EventKind::KemEncapsulation {
            initiator: initiator.clone(),
            target: target.clone(),
            latency_us,
        });
        Ok(())
    }

    /// Record a KEM decapsulation attempt at `target`
    pub fn record_kem_decapsulation(
        &mut self,
        target: &PeerId,
        initiator: &PeerId,
        latency_us: u64,
        success: bool,
    ) -> Result<(), SimError> {
        self.accounted_member(target)?;
        self.accounted_member(initiator)?;
        self.record_accounting(EventKind::KemDecapsulation {
            target: target.clone(),
            initiator: initiator.clone(),
            latency_us,
            success,
        });
        Ok(())
    }

    /// Record an invite issued by `from` to `to` for a named realm
    pub fn record_invite_created(
        &mut self,
        from: &PeerId,
        to: &PeerId,
        realm: impl Into<String>,
    ) -> Result<(), SimError> {
        self.accounted_member(from)?;
        self.accounted_member(to)?;
        self.record_accounting(EventKind::InviteCreated {
            from: from.clone(),
            to: to.clone(),
            realm: realm.into(),
        });
        Ok(())
    }

    pub fn record_invite_accepted(
        &mut self,
        peer: &PeerId,
        realm: impl Into<String>,
    ) -> Result<(), SimError> {
        self.accounted_member(peer)?;
        self.record_accounting(EventKind::InviteAccepted {
            peer: peer.clone(),
            realm: realm.into(),
        });
        Ok(())
    }

    pub fn record_invite_failed(
        &mut self,
        peer: &PeerId,
        realm: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<(), SimError> {
        self.accounted_member(peer)?;
        self.record_accounting(EventKind::InviteFailed {
            peer: peer.clone(),
            realm: realm.into(),
            reason: reason.into(),
        });
        Ok(())
    }
}
