use chrono::Utc;
use repo_ledger::parser::{parse_show_stat, FileChange};
use repo_ledger::remote::RemoteRepository;
use repo_ledger::store::{Permission, RepoStatus, Repository};
use repo_ledger::sync::{
    compare_repositories, consolidated_view, offline_view, ComparisonCounts, SyncStatus,
    ViewStatus,
};
use std::path::PathBuf;

fn local(repo_id: &str) -> Repository {
    Repository {
        local_id: 0,
        repo_id: repo_id.to_string(),
        name: repo_id.to_string(),
        description: String::new(),
        path: PathBuf::from(format!("/src/{repo_id}")),
        status: RepoStatus::Active,
        developer_id: "dev-1".to_string(),
        project_id: None,
        permission: Permission::ReadWrite,
        repo_fingerprint: format!("fp-{repo_id}"),
        last_synced_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn test_remote_listing_with_underscore_ids() {
    let remote: Vec<RemoteRepository> =
        serde_json::from_str(r#"[{"_id":"B","name":"b"},{"_id":"C","name":"c","path":"/c"}]"#)
            .unwrap();

    let comparison = compare_repositories(vec![local("A"), local("B")], remote);
    assert_eq!(
        comparison.counts,
        ComparisonCounts {
            local: 2,
            remote: 2,
            missing_in_remote: 1,
            missing_in_local: 1,
        }
    );

    let view = consolidated_view(&comparison);
    assert_eq!(view.status, ViewStatus::RequiresAction);
    let annotated: Vec<(&str, SyncStatus)> = view
        .repositories
        .iter()
        .map(|r| (r.repo_id.as_str(), r.sync_status))
        .collect();
    assert_eq!(annotated.len(), 3);
    assert!(annotated.contains(&("B", SyncStatus::Synced)));
    assert!(annotated.contains(&("A", SyncStatus::MissingRemote)));
    assert!(annotated.contains(&("C", SyncStatus::MissingLocal)));
}

#[test]
fn test_offline_view_json_shape() {
    let view = offline_view(&[local("A")]);
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["status"], "offline");
    assert_eq!(json["repositories"][0]["syncStatus"], "offline");
    assert!(json.get("counts").is_none());
}

#[test]
fn test_show_stat_summary_example() {
    let stat = parse_show_stat(
        " src/a.ts | 4 ++--\n src/b.ts | 2 +-\n 2 files changed, 4 insertions(+), 2 deletions(-)",
    );

    assert_eq!(stat.total_insertions, 4);
    assert_eq!(stat.total_deletions, 2);
    assert_eq!(
        stat.changes,
        vec![
            FileChange {
                file_name: "src/a.ts".to_string(),
                added: 2,
                removed: 2,
            },
            FileChange {
                file_name: "src/b.ts".to_string(),
                added: 1,
                removed: 1,
            },
        ]
    );
}
