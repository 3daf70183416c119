//! Rolling simulation statistics
//!
//! Counters are folded in one event at a time as records are emitted, never
//! by re-scanning the log, so keeping them is O(1) per event.

use serde::Serialize;

use crate::events::EventKind;

/// Aggregate counters for one simulation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
    pub direct_deliveries: u64,
    pub relayed_deliveries: u64,
    pub total_hops: u64,
    /// Delivery latency summed in ticks from send to delivery
    pub summed_latency_ticks: u64,
    pub wake_events: u64,
    pub sleep_events: u64,

    pub pq_signatures_created: u64,
    pub pq_signatures_verified: u64,
    pub pq_signature_failures: u64,
    pub pq_kem_encapsulations: u64,
    pub pq_kem_decapsulations: u64,
    pub pq_kem_failures: u64,
    pub invites_created: u64,
    pub invites_accepted: u64,
    pub invites_failed: u64,

    pub summed_sign_latency_us: u64,
    pub summed_verify_latency_us: u64,
    pub summed_encap_latency_us: u64,
    pub summed_decap_latency_us: u64,
}

impl SimStats {
    /// Fold one emitted event into the counters
    pub(crate) fn apply(&mut self, kind: &EventKind) {
        match kind {
            EventKind::Send { .. } => self.messages_sent += 1,
            EventKind::Relay { .. } => {}
            EventKind::Delivered {
                latency_ticks,
                hop_count,
                ..
            } => {
                self.messages_delivered += 1;
                self.total_hops += u64::from(*hop_count);
                self.summed_latency_ticks += latency_ticks;
                if *hop_count == 0 {
                    self.direct_deliveries += 1;
                } else {
                    self.relayed_deliveries += 1;
                }
            }
            EventKind::Dropped { .. } => self.messages_dropped += 1,
            EventKind::Hold { .. } => {}
            EventKind::PeerOnline { .. } => self.wake_events += 1,
            EventKind::PeerOffline { .. } => self.sleep_events += 1,
            EventKind::PqSignature { latency_us, .. } => {
                self.pq_signatures_created += 1;
                self.summed_sign_latency_us += latency_us;
            }
            EventKind::PqVerification {
                latency_us,
                success,
                ..
            } => {
                if *success {
                    self.pq_signatures_verified += 1;
                } else {
                    self.pq_signature_failures += 1;
                }
                self.summed_verify_latency_us += latency_us;
            }
            EventKind::KemEncapsulation { latency_us, .. } => {
                self.pq_kem_encapsulations += 1;
                self.summed_encap_latency_us += latency_us;
            }
            EventKind::KemDecapsulation {
                latency_us,
                success,
                ..
            } => {
                if *success {
                    self.pq_kem_decapsulations += 1;
                } else {
                    self.pq_kem_failures += 1;
                }
                self.summed_decap_latency_us += latency_us;
            }
            EventKind::InviteCreated { .. } => self.invites_created += 1,
            EventKind::InviteAccepted { .. } => self.invites_accepted += 1,
            EventKind::InviteFailed { .. } => self.invites_failed += 1,
        }
    }

    /// Fraction of sent packets that were delivered
    pub fn delivery_rate(&self) -> f64 {
        ratio(self.messages_delivered, self.messages_sent)
    }

    /// Mean ticks from send to delivery, over delivered packets
    pub fn average_latency(&self) -> f64 {
        ratio(self.summed_latency_ticks, self.messages_delivered)
    }

    /// Mean relay hops over delivered packets
    pub fn average_hops(&self) -> f64 {
        ratio(self.total_hops, self.messages_delivered)
    }

    /// Failed verifications over all verification attempts
    pub fn signature_failure_rate(&self) -> f64 {
        ratio(
            self.pq_signature_failures,
            self.pq_signatures_verified + self.pq_signature_failures,
        )
    }

    /// Failed decapsulations over all decapsulation attempts
    pub fn kem_failure_rate(&self) -> f64 {
        ratio(
            self.pq_kem_failures,
            self.pq_kem_decapsulations + self.pq_kem_failures,
        )
    }

    pub fn average_sign_latency_us(&self) -> f64 {
        ratio(self.summed_sign_latency_us, self.pq_signatures_created)
    }

    pub fn average_verify_latency_us(&self) -> f64 {
        ratio(
            self.summed_verify_latency_us,
            self.pq_signatures_verified + self.pq_signature_failures,
        )
    }

    pub fn average_encap_latency_us(&self) -> f64 {
        ratio(self.summed_encap_latency_us, self.pq_kem_encapsulations)
    }

    pub fn average_decap_latency_us(&self) -> f64 {
        ratio(
            self.summed_decap_latency_us,
            self.pq_kem_decapsulations + self.pq_kem_failures,
        )
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
