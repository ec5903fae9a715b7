use reviewtrack_core::db::open_db_in_memory;
use reviewtrack_core::{
    PhaseEngine, PhaseState, Project, ProjectListQuery, ProjectRepository, ProjectStatus,
    RepoError, RoleId, RoleKind, RoleOrg, SqliteProjectRepository,
};

fn coded(name: &str, code: &str) -> Project {
    let mut project = Project::new(name, name, "Energy");
    project.code = code.to_string();
    project
}

#[test]
fn save_and_find_roundtrip_preserves_phases_and_roles() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let engine = PhaseEngine::with_defaults();

    let mut project = coded("Site C", "site-c");
    project.region = Some("Peace".to_string());
    project.lat = Some(56.2);
    project.lon = Some(-120.9);
    project.admin_role = Some(RoleId::new("site-c", RoleOrg::Eao, RoleKind::Admin));
    project.access.read.insert("site-c:eao:admin".to_string());
    engine.instantiate("intake", &mut project).unwrap();
    engine.instantiate("pre-ea", &mut project).unwrap();
    project.set_current_phase(0);
    engine.start(&mut project.phases[0]);

    repo.save(&project).unwrap();

    let by_code = repo.find_by_code("site-c").unwrap().unwrap();
    assert_eq!(by_code, project);
    let by_id = repo.find_by_id(project.id).unwrap().unwrap();
    assert_eq!(by_id.phases[0].state, PhaseState::Active);
    assert_eq!(by_id.phases[1].code, "pre-ea");
    assert_eq!(by_id.phases[1].milestones, project.phases[1].milestones);
    assert!(repo.find_by_code("dam-b").unwrap().is_none());
}

#[test]
fn save_updates_existing_row_and_appended_phases() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let engine = PhaseEngine::with_defaults();

    let mut project = coded("Site C", "site-c");
    engine.instantiate("intake", &mut project).unwrap();
    repo.save(&project).unwrap();

    project.status = ProjectStatus::Submitted;
    engine.instantiate("pre-ea", &mut project).unwrap();
    repo.save(&project).unwrap();

    let loaded = repo.find_by_id(project.id).unwrap().unwrap();
    assert_eq!(loaded.status, ProjectStatus::Submitted);
    assert_eq!(loaded.phases.len(), 2);
}

#[test]
fn save_rejects_reordered_or_truncated_phase_history() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let engine = PhaseEngine::with_defaults();

    let mut project = coded("Site C", "site-c");
    engine.instantiate("intake", &mut project).unwrap();
    engine.instantiate("pre-ea", &mut project).unwrap();
    repo.save(&project).unwrap();

    let mut reordered = project.clone();
    reordered.phases.swap(0, 1);
    assert!(matches!(
        repo.save(&reordered),
        Err(RepoError::PhaseHistoryRewritten(id)) if id == project.id
    ));

    let mut truncated = project.clone();
    truncated.phases.pop();
    assert!(matches!(
        repo.save(&truncated),
        Err(RepoError::PhaseHistoryRewritten(_))
    ));
}

#[test]
fn save_rejects_invalid_project_and_duplicate_code() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    let uncoded = Project::new("Site C", "Site C", "Energy");
    assert!(matches!(repo.save(&uncoded), Err(RepoError::Validation(_))));

    repo.save(&coded("Site C", "site-c")).unwrap();
    assert!(matches!(
        repo.save(&coded("Other", "site-c")),
        Err(RepoError::Db(_))
    ));
    assert!(repo.code_exists("site-c").unwrap());
    assert!(!repo.code_exists("site-c-2").unwrap());
}

#[test]
fn list_projects_filters_and_sorts_by_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    let mut zeta = coded("Zeta Dam", "zeta-dam");
    zeta.publish();
    let mut alpha = coded("Alpha Mine", "alpha-mine");
    alpha.publish();
    let mut archived = coded("Beta Pipeline", "beta-pipeline");
    archived.date_completed = Some(1_000);
    let hidden = coded("Gamma Port", "gamma-port");
    for project in [&zeta, &alpha, &archived, &hidden] {
        repo.save(project).unwrap();
    }

    let published = repo
        .list_projects(&ProjectListQuery {
            is_published: Some(true),
            codes: None,
            include_archived: true,
        })
        .unwrap();
    let names: Vec<&str> = published.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha Mine", "Zeta Dam"]);

    let scoped = repo
        .list_projects(&ProjectListQuery {
            is_published: None,
            codes: Some(vec![
                "beta-pipeline".to_string(),
                "gamma-port".to_string(),
                "zeta-dam".to_string(),
            ]),
            include_archived: false,
        })
        .unwrap();
    let codes: Vec<&str> = scoped.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["gamma-port", "zeta-dam"]);

    let none = repo
        .list_projects(&ProjectListQuery {
            codes: Some(vec![]),
            ..ProjectListQuery::default()
        })
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn invalid_persisted_status_is_rejected_on_read() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    repo.save(&coded("Site C", "site-c")).unwrap();

    conn.execute(
        "UPDATE projects SET status = 'paused' WHERE code = 'site-c';",
        [],
    )
    .unwrap();

    assert!(matches!(
        repo.find_by_code("site-c"),
        Err(RepoError::InvalidData(_))
    ));
}
