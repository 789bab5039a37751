#![allow(dead_code)]

//! Shared git fixtures: local bare remotes seeded through a throwaway clone.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{IndexAddOption, Repository, RepositoryInitOptions};

pub fn init_repo(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(path, &opts).unwrap()
}

pub fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = git2::Signature::now("tester", "tester@example.com").unwrap();

    match repo.head() {
        Ok(head) => {
            let parent = repo.find_commit(head.target().unwrap()).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
                .unwrap()
        }
        Err(_) => repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
            .unwrap(),
    }
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Create a bare "remote" whose main branch carries the given files.
pub fn seed_remote(temp: &Path, files: &[(&str, &str)]) -> PathBuf {
    let seed = temp.join("seed");
    fs::create_dir_all(&seed).unwrap();
    let repo = init_repo(&seed);
    write_files(&seed, files);
    commit_all(&repo, "seed");

    let bare = temp.join("remote.git");
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    Repository::init_opts(&bare, &opts).unwrap();

    let status = Command::new("git")
        .args(["push", "--quiet", bare.to_str().unwrap(), "main:main"])
        .current_dir(&seed)
        .status()
        .unwrap();
    assert!(status.success(), "seeding push failed");

    bare
}

/// Install an executable pre-receive hook on a bare remote.
///
/// Hook scripts run with git's quarantine environment set; scripts that
/// inspect or move refs should unset it and address the repository through
/// an explicit `--git-dir`.
#[cfg(unix)]
pub fn install_pre_receive_hook(bare: &Path, script: &str) {
    use std::os::unix::fs::PermissionsExt;

    let hooks = bare.join("hooks");
    fs::create_dir_all(&hooks).unwrap();
    let hook = hooks.join("pre-receive");
    fs::write(&hook, script).unwrap();
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Content of a file at the remote's main head.
pub fn remote_file(bare: &Path, rel: &str) -> String {
    let repo = Repository::open(bare).unwrap();
    let commit = repo
        .revparse_single("main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    let tree = commit.tree().unwrap();
    let entry = tree.get_path(Path::new(rel)).unwrap();
    let blob = entry.to_object(&repo).unwrap().peel_to_blob().unwrap();
    String::from_utf8(blob.content().to_vec()).unwrap()
}

/// Commit id at the remote's main head.
pub fn remote_head_id(bare: &Path) -> String {
    let repo = Repository::open(bare).unwrap();
    repo.revparse_single("main").unwrap().id().to_string()
}

/// Commit message at the remote's main head.
pub fn remote_head_message(bare: &Path) -> String {
    let repo = Repository::open(bare).unwrap();
    let commit = repo
        .revparse_single("main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    commit.message().unwrap().trim_end().to_string()
}
