// tests/git2_repository_test.rs
use git2::{Oid, Repository as Git2Repo, Signature};
use releng::git::{Git2Repository, Repository};
use releng::promotion::{check_merge_forward, discover_chain, merge_forward};
use releng::RelengError;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    repo: Git2Repo,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Git2Repo::init(dir.path()).unwrap();
        // keep HEAD off every branch the tests create
        repo.set_head("refs/heads/work").unwrap();
        Fixture { _dir: dir, repo }
    }

    fn commit(&self, parents: &[Oid], file: &str, content: &str) -> Oid {
        let sig = Signature::now("Test Author", "test@example.com").unwrap();
        let blob = self.repo.blob(content.as_bytes()).unwrap();

        let mut builder = match parents.first() {
            Some(parent) => {
                let tree = self.repo.find_commit(*parent).unwrap().tree().unwrap();
                self.repo.treebuilder(Some(&tree)).unwrap()
            }
            None => self.repo.treebuilder(None).unwrap(),
        };
        builder.insert(file, blob, 0o100644).unwrap();
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();

        let parents: Vec<_> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parent_refs: Vec<_> = parents.iter().collect();
        self.repo
            .commit(None, &sig, &sig, &format!("Change {}", file), &tree, &parent_refs)
            .unwrap()
    }

    fn remote_branch(&self, name: &str, oid: Oid) {
        self.repo
            .reference(&format!("refs/remotes/origin/{}", name), oid, true, "test")
            .unwrap();
    }

    fn local_branch(&self, name: &str, oid: Oid) {
        let commit = self.repo.find_commit(oid).unwrap();
        self.repo.branch(name, &commit, true).unwrap();
    }

    fn open(&self) -> Git2Repository {
        Git2Repository::open(self.repo.path()).unwrap()
    }
}

/// origin/2.5-dev is one commit ahead of origin/2.6-dev and origin/master
fn diverged() -> (Fixture, Oid, Oid) {
    let fixture = Fixture::new();
    let base = fixture.commit(&[], "README", "pulp\n");
    let fix = fixture.commit(&[base], "fix.txt", "hotfix\n");

    fixture.remote_branch("2.5-dev", fix);
    fixture.remote_branch("2.6-dev", base);
    fixture.remote_branch("master", base);
    (fixture, base, fix)
}

#[test]
fn test_remote_branches_are_sorted_without_head() {
    let (fixture, _, _) = diverged();
    fixture
        .repo
        .reference_symbolic(
            "refs/remotes/origin/HEAD",
            "refs/remotes/origin/master",
            true,
            "test",
        )
        .unwrap();
    fixture.remote_branch("2.10-dev", fixture.repo.refname_to_id("refs/remotes/origin/master").unwrap());

    let repo = fixture.open();
    assert_eq!(
        repo.remote_branches("origin").unwrap(),
        vec!["2.10-dev", "2.5-dev", "2.6-dev", "master"]
    );
    assert!(repo.remote_branches("upstream").unwrap().is_empty());
}

#[test]
fn test_unmerged_commits() {
    let (fixture, _, fix) = diverged();
    let repo = fixture.open();

    let missing = repo.unmerged_commits("origin/2.5-dev", "origin/2.6-dev").unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].hash, fix.to_string());
    assert_eq!(missing[0].author, "Test Author");

    assert!(repo
        .unmerged_commits("origin/2.6-dev", "origin/2.5-dev")
        .unwrap()
        .is_empty());
}

#[test]
fn test_unknown_ref_is_git_error() {
    let (fixture, _, _) = diverged();
    let repo = fixture.open();
    assert!(matches!(
        repo.unmerged_commits("origin/9.9-dev", "origin/master"),
        Err(RelengError::Git(_))
    ));
}

#[test]
fn test_check_merge_forward_against_git() {
    let (fixture, _, _) = diverged();
    let repo = fixture.open();

    let chain = discover_chain(&repo, "2.5-dev", None, false, "origin").unwrap();
    match check_merge_forward(&repo, &chain) {
        Err(RelengError::PromotionViolation { src, dest, commits }) => {
            assert_eq!(src, "origin/2.5-dev");
            assert_eq!(dest, "origin/2.6-dev");
            assert_eq!(commits, 1);
        }
        other => panic!("expected promotion violation, got {:?}", other),
    }
}

#[test]
fn test_merge_ours_keeps_destination_tree() {
    let (fixture, base, fix) = diverged();
    let repo = fixture.open();

    let merge = repo
        .merge_ours("origin/2.5-dev", "2.6-dev", "origin")
        .unwrap()
        .expect("a merge commit");

    let merge = fixture
        .repo
        .find_commit(Oid::from_str(&merge).unwrap())
        .unwrap();
    let parents: Vec<Oid> = merge.parent_ids().collect();
    assert_eq!(parents, vec![base, fix]);
    assert_eq!(
        merge.tree_id(),
        fixture.repo.find_commit(base).unwrap().tree_id()
    );

    assert!(repo
        .unmerged_commits("origin/2.5-dev", "2.6-dev")
        .unwrap()
        .is_empty());
    assert_eq!(
        repo.merge_ours("origin/2.5-dev", "2.6-dev", "origin").unwrap(),
        None
    );
}

#[test]
fn test_current_and_upstream_branch() {
    let (fixture, _, fix) = diverged();
    fixture
        .repo
        .remote("origin", "https://example.invalid/pulp.git")
        .unwrap();

    let head = fixture.repo.find_commit(fix).unwrap();
    let mut local = fixture.repo.branch("2.5-dev", &head, true).unwrap();
    local.set_upstream(Some("origin/2.5-dev")).unwrap();
    fixture.repo.set_head("refs/heads/2.5-dev").unwrap();

    let repo = fixture.open();
    assert_eq!(repo.current_branch().unwrap(), "2.5-dev");
    assert_eq!(repo.upstream_branch().unwrap(), "origin/2.5-dev");
}

#[test]
fn test_merge_ours_fast_forwards_stale_local_branch() {
    let (fixture, base, fix) = diverged();
    let newer = fixture.commit(&[base], "sync.txt", "upstream work\n");
    fixture.remote_branch("2.6-dev", newer);
    fixture.local_branch("2.6-dev", base);

    let repo = fixture.open();
    let merge = repo
        .merge_ours("origin/2.5-dev", "2.6-dev", "origin")
        .unwrap()
        .expect("a merge commit");

    let merge = fixture
        .repo
        .find_commit(Oid::from_str(&merge).unwrap())
        .unwrap();
    let parents: Vec<Oid> = merge.parent_ids().collect();
    assert_eq!(parents, vec![newer, fix]);
    assert!(repo
        .unmerged_commits("origin/2.6-dev", "2.6-dev")
        .unwrap()
        .is_empty());
}

#[test]
fn test_merge_ours_refuses_diverged_local_branch() {
    let (fixture, base, _) = diverged();
    let upstream = fixture.commit(&[base], "sync.txt", "upstream work\n");
    let local_only = fixture.commit(&[base], "local.txt", "unpushed work\n");
    fixture.remote_branch("2.6-dev", upstream);
    fixture.local_branch("2.6-dev", local_only);

    let repo = fixture.open();
    assert!(matches!(
        repo.merge_ours("origin/2.5-dev", "2.6-dev", "origin"),
        Err(RelengError::Validation(_))
    ));
    assert_eq!(
        fixture.repo.refname_to_id("refs/heads/2.6-dev").unwrap(),
        local_only
    );
}

#[test]
fn test_merge_forward_through_every_hop() {
    let (fixture, base, _) = diverged();
    fixture.remote_branch("2.7-dev", base);
    let repo = fixture.open();

    let chain = discover_chain(&repo, "2.5-dev", None, false, "origin").unwrap();
    assert_eq!(chain.len(), 4);

    let records = merge_forward(&repo, &chain, "origin", false).unwrap();
    let hops: Vec<(&str, &str)> = records
        .iter()
        .map(|r| (r.src.as_str(), r.dest.as_str()))
        .collect();
    assert_eq!(
        hops,
        vec![
            ("origin/2.5-dev", "2.6-dev"),
            ("2.6-dev", "2.7-dev"),
            ("2.7-dev", "master")
        ]
    );

    for (src, dest) in [
        ("origin/2.5-dev", "2.6-dev"),
        ("2.6-dev", "2.7-dev"),
        ("2.7-dev", "master"),
        ("origin/2.5-dev", "master"),
    ] {
        assert!(
            repo.unmerged_commits(src, dest).unwrap().is_empty(),
            "{} not merged into {}",
            src,
            dest
        );
    }

    let master = fixture
        .repo
        .revparse_single("refs/heads/master")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(
        master.tree_id(),
        fixture.repo.find_commit(base).unwrap().tree_id()
    );

    assert!(merge_forward(&repo, &chain, "origin", false)
        .unwrap()
        .is_empty());
}
