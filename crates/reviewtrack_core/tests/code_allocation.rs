use reviewtrack_core::db::open_db_in_memory;
use reviewtrack_core::{
    allocate_code, guarantee_unique_code, Project, ProjectRepository, SqliteProjectRepository,
};

fn persist(repo: &SqliteProjectRepository<'_>, code: &str) {
    let mut project = Project::new(code, code, "Energy");
    project.code = code.to_string();
    repo.save(&project).unwrap();
}

#[test]
fn free_candidate_is_returned_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    let candidate = allocate_code("Site C").unwrap();
    assert_eq!(guarantee_unique_code(&repo, &candidate).unwrap(), "site-c");
}

#[test]
fn taken_candidate_gets_first_free_suffix() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    persist(&repo, "site-c");
    persist(&repo, "site-c-2");
    persist(&repo, "site-c-4");

    assert_eq!(guarantee_unique_code(&repo, "site-c").unwrap(), "site-c-3");
}

#[test]
fn probing_does_not_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    persist(&repo, "site-c");

    guarantee_unique_code(&repo, "site-c").unwrap();
    guarantee_unique_code(&repo, "site-c").unwrap();
    assert!(!repo.code_exists("site-c-2").unwrap());
}
