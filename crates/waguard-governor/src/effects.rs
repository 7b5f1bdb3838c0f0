// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger rows implied by a change in action flags.

use chrono::{DateTime, Utc};
use waguard_core::{
    BlockChange, BlockResolution, BlockType, ConnectionId, LimitType, PolicyAction, ResolvedBy,
    Snapshot, ThrottleSettings, WarmupAutoBlock, WarmupLimitChange, WarmupState,
};
use waguard_health::ActionChange;

/// Why the flags moved, carried into block and limit rows.
pub(crate) struct Cause<'a> {
    /// Stored as `trigger_event` on opened blocks.
    pub trigger_event: &'a str,
    /// Appended to limit-change reasons.
    pub detail: &'a str,
    pub resolved_by: ResolvedBy,
}

#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub blocks: Vec<BlockChange>,
    pub limit_changes: Vec<WarmupLimitChange>,
}

/// Blocks to open or resolve and throttle limit rows for `changes`.
///
/// A pause-type action opens its block only when none is open, and resolves
/// it only when one is.
#[allow(clippy::too_many_arguments)]
pub(crate) fn for_changes(
    connection_id: ConnectionId,
    snapshot: &Snapshot,
    changes: &[ActionChange],
    before: &ThrottleSettings,
    after: &ThrottleSettings,
    state: WarmupState,
    cause: &Cause<'_>,
    now: DateTime<Utc>,
) -> Effects {
    let mut effects = Effects::default();

    for change in changes {
        let Some(block_type) = change.action.block_type() else {
            continue;
        };
        let open = snapshot.has_open_block(block_type);
        if change.applied && !open {
            let blocked_until = match block_type {
                BlockType::ReconnectBlock => after.reconnect_blocked_until,
                _ => None,
            };
            effects.blocks.push(BlockChange::Open(WarmupAutoBlock::open(
                connection_id,
                block_type,
                cause.trigger_event,
                now,
                blocked_until,
            )));
        } else if !change.applied && open {
            effects.blocks.push(BlockChange::Resolve(BlockResolution {
                block_type,
                resolved_at: now,
                resolved_by: cause.resolved_by,
            }));
        }
    }

    let throttles = [
        (
            LimitType::BatchSize,
            PolicyAction::ReduceBatch,
            before.batch_size_override,
            after.batch_size_override,
        ),
        (
            LimitType::DelaySeconds,
            PolicyAction::AddDelay,
            before.delay_override_secs,
            after.delay_override_secs,
        ),
    ];
    for (limit_type, action, old, new) in throttles {
        if old == new {
            continue;
        }
        let verb = if new.is_some() { "applied" } else { "cleared" };
        effects.limit_changes.push(WarmupLimitChange {
            id: None,
            connection_id,
            limit_type,
            // zero stands for "no override"
            old_value: old.unwrap_or(0),
            new_value: new.unwrap_or(0),
            reason: format!("{action} {verb} ({})", cause.detail),
            warmup_state_at_change: state,
            created_at: now,
        });
    }

    effects
}
