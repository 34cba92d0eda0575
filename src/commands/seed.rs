use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

use crate::db::Database;
use crate::models::{NewTicket, Role, Status};

/// Demo categories, each paired with one item.
pub const SEED_TAXONOMY: [(&str, &str); 5] = [
    ("Reclamação", "Atendimento"),
    ("Sugestão", "Infraestrutura"),
    ("Elogio", "Professores"),
    ("Dúvida", "Matrícula"),
    ("Problema Técnico", "Sistema"),
];

pub const SEED_TYPES: [&str; 3] = ["Urgente", "Normal", "Baixa Prioridade"];

pub const SEED_STUDENTS: [(&str, &str, &str); 5] = [
    ("João Silva", "joao.silva@email.com", "(62) 99999-1111"),
    ("Maria Santos", "maria.santos@email.com", "(62) 99999-2222"),
    ("Pedro Oliveira", "pedro.oliveira@email.com", "(62) 99999-3333"),
    ("Ana Costa", "ana.costa@email.com", "(62) 99999-4444"),
    ("Carlos Ferreira", "carlos.ferreira@email.com", "(62) 99999-5555"),
];

/// Ids of the rows tickets are drawn from.
#[derive(Debug, Clone, Default)]
struct Pools {
    /// (category id, item id)
    taxonomy: Vec<(i64, i64)>,
    types: Vec<i64>,
    students: Vec<i64>,
}

fn pick<R: Rng, T: Copy>(rng: &mut R, pool: &[T]) -> Option<T> {
    if pool.is_empty() {
        None
    } else {
        Some(pool[rng.random_range(0..pool.len())])
    }
}

fn build_tickets<R: Rng>(
    rng: &mut R,
    pools: &Pools,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<NewTicket> {
    (0..count)
        .filter_map(|i| {
            let (category_id, item_id) = pick(rng, &pools.taxonomy)?;
            let created_at = now
                - Duration::days(rng.random_range(0..30))
                - Duration::minutes(rng.random_range(0..24 * 60));
            let (status, finished_at) = if rng.random_bool(0.7) {
                let finished = created_at + Duration::hours(rng.random_range(24..=7 * 24));
                (Status::Done, Some(finished.min(now)))
            } else if rng.random_bool(0.5) {
                (Status::InProgress, None)
            } else {
                (Status::Waiting, None)
            };
            Some(NewTicket {
                title: format!("Demo ticket {}", i + 1),
                description: None,
                category_id,
                item_id: Some(item_id),
                type_id: pick(rng, &pools.types),
                requester_id: pick(rng, &pools.students),
                status,
                created_at,
                finished_at,
            })
        })
        .collect()
}

fn ensure_pools(db: &Database) -> Result<Pools> {
    let mut pools = Pools::default();

    for (category, item) in SEED_TAXONOMY {
        let category_id = match db.get_category_by_name(category)? {
            Some(c) => c.id,
            None => db.create_category(category)?,
        };
        let item_id = match db.get_item_by_name(item)? {
            Some(i) => i.id,
            None => db.create_item(item, category_id)?,
        };
        pools.taxonomy.push((category_id, item_id));
    }

    for name in SEED_TYPES {
        let id = match db.get_type_by_name(name)? {
            Some(t) => t.id,
            None => db.create_type(name)?,
        };
        pools.types.push(id);
    }

    for (name, email, phone) in SEED_STUDENTS {
        let id = match db.find_user_by_email(email)? {
            Some(u) => u.id,
            None => db.create_user_with_phone(email, name, Role::Student, Some(phone))?,
        };
        pools.students.push(id);
    }

    Ok(pools)
}

/// Fills the database with demo taxonomy, students and tickets.
pub fn run(db: &Database, count: usize) -> Result<()> {
    let pools = ensure_pools(db)?;
    let tickets = build_tickets(&mut rand::rng(), &pools, count, Utc::now());
    let done = tickets.iter().filter(|t| t.status.is_done()).count();
    for ticket in &tickets {
        db.insert_ticket(ticket)?;
    }

    info!(tickets = tickets.len(), done, "seeded demo data");
    println!(
        "Seeded {} tickets ({} done) across {} categories",
        tickets.len(),
        done,
        pools.taxonomy.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn pools() -> Pools {
        Pools {
            taxonomy: vec![(4, 40), (5, 50)],
            types: vec![1, 2, 3],
            students: vec![7],
        }
    }

    #[test]
    fn test_run_creates_taxonomy_once() {
        let (db, _dir) = setup_test_db();
        run(&db, 10).unwrap();
        run(&db, 10).unwrap();

        assert_eq!(db.list_categories().unwrap().len(), 5);
        assert_eq!(db.list_items(None).unwrap().len(), 5);
        assert_eq!(db.list_types().unwrap().len(), 3);
        assert_eq!(db.list_tickets(None).unwrap().len(), 20);
        let student = db.find_user_by_email("ana.costa@email.com").unwrap().unwrap();
        assert_eq!(student.role, Role::Student);
        assert_eq!(student.phone.as_deref(), Some("(62) 99999-4444"));
    }

    #[test]
    fn test_run_items_match_categories() {
        let (db, _dir) = setup_test_db();
        run(&db, 40).unwrap();

        for ticket in db.list_tickets(None).unwrap() {
            let item = db.get_item(ticket.item_id.unwrap()).unwrap().unwrap();
            assert_eq!(item.category_id, ticket.category_id);
            assert!(ticket.type_id.is_some());
            assert!(ticket.requester_id.is_some());
        }
    }

    #[test]
    fn test_run_zero() {
        let (db, _dir) = setup_test_db();
        run(&db, 0).unwrap();
        assert!(db.list_tickets(None).unwrap().is_empty());
    }

    #[test]
    fn test_build_tickets_done_ratio() {
        let mut rng = StdRng::seed_from_u64(7);
        let tickets = build_tickets(&mut rng, &pools(), 1000, Utc::now());
        let done = tickets.iter().filter(|t| t.status.is_done()).count();
        assert!((600..=800).contains(&done), "done = {}", done);
    }

    #[test]
    fn test_build_tickets_never_finish_in_future() {
        let mut rng = StdRng::seed_from_u64(11);
        let now = Utc::now();
        let tickets = build_tickets(&mut rng, &pools(), 500, now);

        let recent_done: Vec<_> = tickets
            .iter()
            .filter(|t| t.status.is_done() && t.created_at > now - Duration::days(1))
            .collect();
        assert!(!recent_done.is_empty());
        for t in recent_done {
            assert_eq!(t.finished_at, Some(now));
        }
    }

    #[test]
    fn test_build_tickets_empty_taxonomy() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(build_tickets(&mut rng, &Pools::default(), 10, Utc::now()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_build_tickets_consistent(seed in any::<u64>(), count in 0usize..60) {
            let mut rng = StdRng::seed_from_u64(seed);
            let now = Utc::now();
            let tickets = build_tickets(&mut rng, &pools(), count, now);
            prop_assert_eq!(tickets.len(), count);
            for t in &tickets {
                prop_assert!([(4, Some(40)), (5, Some(50))].contains(&(t.category_id, t.item_id)));
                prop_assert_eq!(t.requester_id, Some(7));
                prop_assert!(t.created_at <= now);
                prop_assert!(t.created_at > now - Duration::days(31));
                match t.finished_at {
                    Some(f) => {
                        prop_assert_eq!(t.status, Status::Done);
                        prop_assert!(f <= now);
                        prop_assert!(f >= t.created_at);
                        prop_assert!(f - t.created_at <= Duration::days(7));
                    }
                    None => prop_assert!(!t.status.is_done()),
                }
            }
        }
    }
}
