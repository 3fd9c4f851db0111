use std::collections::HashSet;

use sqlx::PgPool;

use crate::mute_buffer::MutePQBuffer;

/// Shared handle to the mute/block lookup query. Cloning is cheap (the
/// underlying pool is reference counted) — every `MuteableBus` forwarder
/// holds the same handle rather than preparing its own statement.
#[derive(Clone)]
pub struct MuteQuery {
    pool: PgPool,
}

impl MuteQuery {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the subset of `subscribers` that mute or block any of
    /// `targets`.
    pub async fn muted_subscribers(
        &self,
        subscribers: &[i64],
        targets: &[i64],
    ) -> Result<HashSet<i64>, sqlx::Error> {
        let mut subscriber_buf = MutePQBuffer::with_capacity_hint(subscribers.len());
        for id in subscribers {
            subscriber_buf.write(*id);
        }
        let mut target_buf = MutePQBuffer::with_capacity_hint(targets.len());
        for id in targets {
            target_buf.write(*id);
        }

        let rows: Vec<i64> = sqlx::query_scalar(
            r#"SELECT account_id FROM block_mutes
               WHERE account_id = ANY($1::bigint[]) AND target_account_id = ANY($2::bigint[])
               GROUP BY account_id"#,
        )
        .bind(subscriber_buf.finalize())
        .bind(target_buf.finalize())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
