//! Demo scene loader.
//!
//! The real CVS RCS-file reader and Bloom/mark bookkeeping that a production
//! build of this tool would use are out of scope (§1's external
//! collaborators). This module stands in for them: it lowers a small,
//! serde-friendly JSON description of a commit history into the real
//! `model` types, so the driver can be exercised end-to-end without a CVS
//! repository on disk.

use crate::atom::Atom;
use crate::bloom::bloom_for_names;
use crate::model::BranchHead;
use crate::model::Commit;
use crate::model::Directory;
use crate::model::FileRevisionData;
use crate::model::RevisionNumber;
use crate::model::Tag;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Deserialize)]
pub struct SceneFile {
    pub commits: Vec<SceneCommit>,
    pub branches: Vec<SceneBranch>,
    #[serde(default)]
    pub tags: Vec<SceneTag>,
}

#[derive(Debug, Deserialize)]
pub struct SceneCommit {
    pub id: String,
    pub author: String,
    pub log: String,
    pub date: i64,
    pub parent: Option<String>,
    #[serde(default)]
    pub tail: bool,
    pub files: Vec<SceneFileRevision>,
}

#[derive(Debug, Deserialize)]
pub struct SceneFileRevision {
    pub name: String,
    pub revision: String,
    #[serde(default)]
    pub executable: bool,
}

#[derive(Debug, Deserialize)]
pub struct SceneBranch {
    pub ref_name: String,
    pub commit: String,
    #[serde(default)]
    pub tail: bool,
}

#[derive(Debug, Deserialize)]
pub struct SceneTag {
    pub name: String,
    pub commit: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("could not read scene file {path}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse scene file {path}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("commit {0:?} references unknown parent {1:?}")]
    UnknownParent(String, String),
    #[error("branch/tag references unknown commit {0:?}")]
    UnknownCommit(String),
    #[error("revision number {0:?} is not dot-separated integers")]
    BadRevision(String),
}

pub struct Scene {
    pub branches: Vec<BranchHead>,
    pub tags: Vec<Tag>,
}

pub fn load_scene(path: &Path) -> Result<Scene, SceneError> {
    let text = std::fs::read_to_string(path).map_err(|source| SceneError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let deserializer = &mut serde_json::Deserializer::from_str(&text);
    let scene: SceneFile =
        serde_path_to_error::deserialize(deserializer).map_err(|source| SceneError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    lower(scene)
}

fn parse_revision(text: &str) -> Result<RevisionNumber, SceneError> {
    let parts: Result<Vec<u32>, _> = text.split('.').map(str::parse).collect();
    parts
        .map(RevisionNumber::new)
        .map_err(|_| SceneError::BadRevision(text.to_string()))
}

fn lower(scene: SceneFile) -> Result<Scene, SceneError> {
    let mut built: HashMap<String, Rc<Commit>> = HashMap::new();

    for scene_commit in &scene.commits {
        let parent = match &scene_commit.parent {
            Some(parent_id) => Some(
                built
                    .get(parent_id)
                    .ok_or_else(|| {
                        SceneError::UnknownParent(scene_commit.id.clone(), parent_id.clone())
                    })?
                    .clone(),
            ),
            None => None,
        };

        let mut files = Vec::new();
        for scene_file in &scene_commit.files {
            let revision = parse_revision(&scene_file.revision)?;
            files.push(FileRevisionData::new(
                Atom::new(scene_file.name.as_str()),
                revision,
                scene_file.executable,
            ));
        }
        files.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

        let bloom = bloom_for_names(files.iter().map(|f| f.name.as_bytes()));
        let commit = Commit::new(
            Atom::new(scene_commit.author.as_str()),
            scene_commit.log.as_str().into(),
            scene_commit.date,
            parent,
            scene_commit.tail,
            vec![Directory::new(files)],
            bloom,
        );
        built.insert(scene_commit.id.clone(), commit);
    }

    let branches = scene
        .branches
        .into_iter()
        .map(|b| {
            built
                .get(&b.commit)
                .cloned()
                .map(|commit| BranchHead {
                    ref_name: b.ref_name.as_str().into(),
                    commit,
                    tail: b.tail,
                })
                .ok_or(SceneError::UnknownCommit(b.commit))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let tags = scene
        .tags
        .into_iter()
        .map(|t| {
            built
                .get(&t.commit)
                .cloned()
                .map(|commit| Tag {
                    name: t.name.as_str().into(),
                    commit,
                })
                .ok_or(SceneError::UnknownCommit(t.commit))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Scene { branches, tags })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_a_two_commit_branch() {
        let json = r#"{
            "commits": [
                {"id": "c1", "author": "ada", "log": "root", "date": 1, "files": [
                    {"name": "a.c", "revision": "1.1"}
                ]},
                {"id": "c2", "author": "ada", "log": "child", "date": 2, "parent": "c1", "files": [
                    {"name": "a.c", "revision": "1.2"},
                    {"name": "b.c", "revision": "1.1", "executable": true}
                ]}
            ],
            "branches": [{"ref_name": "refs/heads/master", "commit": "c2"}],
            "tags": [{"name": "refs/tags/v1", "commit": "c1"}]
        }"#;
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        let scene: SceneFile = serde_path_to_error::deserialize(deserializer).unwrap();
        let lowered = lower(scene).unwrap();
        assert_eq!(lowered.branches.len(), 1);
        assert_eq!(lowered.tags.len(), 1);
        assert_eq!(lowered.branches[0].commit.iter_files().count(), 2);
    }

    #[test]
    fn rejects_unknown_parent() {
        let json = r#"{
            "commits": [
                {"id": "c1", "author": "ada", "log": "x", "date": 1, "parent": "missing", "files": []}
            ],
            "branches": []
        }"#;
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        let scene: SceneFile = serde_path_to_error::deserialize(deserializer).unwrap();
        assert!(lower(scene).is_err());
    }
}
