//! User membership changes, the audit records they produce, and the two
//! percentage-driven enrollment paths.
//!
//! `update_user` runs as one transaction in a fixed order: explicit adds,
//! planning of TTL removals, automatic enrollment, explicit removes. Nothing
//! becomes visible (and no timer is armed) until the commit succeeds.
//!
//! Automatic enrollment draws a single value per call, so a user's outcomes
//! across segments in the same call are correlated: a user lands in every
//! segment whose percent is at least the draw.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::sqlite::{SqliteConnection, SqlitePool};

use crate::clock::Clock;
use crate::db::begin_write;
use crate::error::Result;
use crate::history::{append_record, Operation};
use crate::queries::{memberships, segments};
use crate::registry::resolve_live_segment;
use crate::schedule::{persist_removals, Scheduler};

/// Names of the live segments the user belongs to, sorted by name
pub async fn get_segments(pool: &SqlitePool, user_id: i64) -> Result<Vec<String>> {
    let sql = memberships::select_segment_names_for_user(user_id);
    let names: Vec<String> = sqlx::query_scalar(&sql).fetch_all(pool).await?;
    Ok(names)
}

/// Apply adds, automatic enrollment and removes for one user atomically
///
/// With `ttl_secs > 0` every explicitly added segment is also planned for
/// removal `ttl_secs` seconds from now.
pub async fn update_user(
    pool: &SqlitePool,
    clock: &dyn Clock,
    scheduler: &Scheduler,
    user_id: i64,
    add: &[String],
    remove: &[String],
    ttl_secs: u64,
) -> Result<()> {
    let now_ms = clock.now().timestamp_millis();
    let mut tx = begin_write(pool).await?;

    let mut added_ids = Vec::with_capacity(add.len());
    for name in add {
        let segment_id = resolve_live_segment(&mut tx, name).await?;
        sqlx::query(&memberships::insert_or_ignore(user_id, segment_id))
            .execute(&mut *tx)
            .await?;
        append_record(&mut tx, now_ms, user_id, segment_id, Operation::Add).await?;
        added_ids.push(segment_id);
    }

    let planned = if ttl_secs > 0 && !added_ids.is_empty() {
        let ttl_ms = i64::try_from(ttl_secs).unwrap_or(i64::MAX).saturating_mul(1000);
        let eta_ms = now_ms.saturating_add(ttl_ms);
        persist_removals(&mut tx, eta_ms, user_id, &added_ids).await?
    } else {
        Vec::new()
    };

    let xi = draw_xi(&mut rand::thread_rng());
    let enrolled = enroll_automatically(&mut tx, now_ms, user_id, xi).await?;

    for name in remove {
        let segment_id = resolve_live_segment(&mut tx, name).await?;
        sqlx::query(&memberships::delete(user_id, segment_id))
            .execute(&mut *tx)
            .await?;
        append_record(&mut tx, now_ms, user_id, segment_id, Operation::Remove).await?;
    }

    tx.commit().await?;

    debug!(
        "Updated user {}: +{} -{} (auto-enrolled {}, xi = {:.2})",
        user_id,
        add.len(),
        remove.len(),
        enrolled,
        xi
    );

    if !planned.is_empty() {
        info!(
            "Planned {} removals for user {} in {}s",
            planned.len(),
            user_id,
            ttl_secs
        );
        scheduler.arm_all(planned);
    }

    Ok(())
}

/// One uniform draw in [0, 100) shared by every segment in a call
pub fn draw_xi<R: Rng>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..100.0)
}

/// Enroll the user into every live segment whose percent is at least `xi`
///
/// Only rows that were actually inserted get an audit record.
async fn enroll_automatically(
    conn: &mut SqliteConnection,
    stamp_ms: i64,
    user_id: i64,
    xi: f64,
) -> Result<usize> {
    let segment_ids: Vec<i64> = sqlx::query_scalar(&segments::select_auto_enroll_ids(xi))
        .fetch_all(&mut *conn)
        .await?;

    let mut enrolled = 0;
    for segment_id in segment_ids {
        let inserted = sqlx::query(&memberships::insert_or_ignore(user_id, segment_id))
            .execute(&mut *conn)
            .await?
            .rows_affected();
        if inserted > 0 {
            append_record(conn, stamp_ms, user_id, segment_id, Operation::Add).await?;
            enrolled += 1;
        }
    }
    Ok(enrolled)
}

/// Enroll roughly `percent`% of all known users into a freshly created segment
///
/// Known users are those with at least one membership row.
pub(crate) async fn enroll_retroactively(
    conn: &mut SqliteConnection,
    stamp_ms: i64,
    segment_id: i64,
    percent: i64,
) -> Result<usize> {
    let known_users: Vec<i64> = sqlx::query_scalar(&memberships::select_known_user_ids())
        .fetch_all(&mut *conn)
        .await?;

    let selected = percentile_sample(&known_users, percent, &mut rand::thread_rng());

    let mut enrolled = 0;
    for user_id in selected {
        let inserted = sqlx::query(&memberships::insert_or_ignore(user_id, segment_id))
            .execute(&mut *conn)
            .await?
            .rows_affected();
        if inserted > 0 {
            append_record(conn, stamp_ms, user_id, segment_id, Operation::Add).await?;
            enrolled += 1;
        }
    }
    Ok(enrolled)
}

/// Pick users by random percentile rank
///
/// Users are shuffled and ranked `i / (n - 1)`; those ranked below
/// `percent / 100` are kept. 100 keeps everybody, 0 keeps nobody.
pub fn percentile_sample<R: Rng>(users: &[i64], percent: i64, rng: &mut R) -> Vec<i64> {
    if percent <= 0 || users.is_empty() {
        return Vec::new();
    }

    let mut shuffled = users.to_vec();
    shuffled.shuffle(rng);
    if percent >= 100 {
        return shuffled;
    }

    let threshold = percent as f64 / 100.0;
    let last = (shuffled.len() - 1) as f64;
    shuffled
        .into_iter()
        .enumerate()
        .take_while(|(rank, _)| {
            let percent_rank = if last == 0.0 { 0.0 } else { *rank as f64 / last };
            percent_rank < threshold
        })
        .map(|(_, user_id)| user_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_sample_zero_and_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(percentile_sample(&[1, 2, 3], 0, &mut rng).is_empty());
        assert!(percentile_sample(&[], 50, &mut rng).is_empty());
    }

    #[test]
    fn test_sample_hundred_keeps_everyone() {
        let mut rng = StdRng::seed_from_u64(2);
        let users: Vec<i64> = (1..=17).collect();
        let mut picked = percentile_sample(&users, 100, &mut rng);
        picked.sort();
        assert_eq!(picked, users);
    }

    #[test]
    fn test_sample_single_user_any_positive_percent() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(percentile_sample(&[42], 1, &mut rng), vec![42]);
    }

    #[test]
    fn test_sample_half_of_eleven() {
        // ranks 0, 0.1, ... 1.0; below 0.5 are the first five
        let mut rng = StdRng::seed_from_u64(4);
        let users: Vec<i64> = (100..111).collect();
        let picked = percentile_sample(&users, 50, &mut rng);
        assert_eq!(picked.len(), 5);

        let unique: HashSet<i64> = picked.iter().copied().collect();
        assert_eq!(unique.len(), 5);
        assert!(picked.iter().all(|u| users.contains(u)));
    }

    #[test]
    fn test_draw_xi_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let xi = draw_xi(&mut rng);
            assert!((0.0..100.0).contains(&xi));
        }
    }
}
