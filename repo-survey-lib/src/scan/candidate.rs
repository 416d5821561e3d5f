use super::Architecture;
use crate::Result;
use crate::github::RepoRef;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A repository that passed classification, as stored in the candidate list.
///
/// Column names follow the published dataset; the original Portuguese headers are
/// still accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "Name", alias = "Nome")]
    pub name: String,

    #[serde(rename = "Owner", alias = "Proprietário")]
    pub owner: String,

    #[serde(rename = "Stars", alias = "Estrelas")]
    pub stars: u64,

    #[serde(rename = "SDK")]
    pub sdk: String,

    #[serde(rename = "Architecture", alias = "Arquitetura")]
    pub architecture: Architecture,

    #[serde(rename = "Solution Directory", alias = "Diretório SLN", default)]
    pub solution_dir: String,
}

impl Candidate {
    #[must_use]
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.name)
    }
}

/// Column headers of the candidate list, in order.
pub const CANDIDATE_HEADERS: [&str; 6] = ["Name", "Owner", "Stars", "SDK", "Architecture", "Solution Directory"];

/// Read a candidate list.
pub fn read_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let mut reader = csv::Reader::from_path(path).into_app_err_with(|| format!("opening candidate list '{}'", path.display()))?;

    reader
        .deserialize::<Candidate>()
        .enumerate()
        .map(|(i, row)| row.into_app_err_with(|| format!("parsing row {} of '{}'", i + 2, path.display())))
        .collect()
}

/// Write a candidate list, replacing any existing file.
pub fn write_candidates(path: &Path, candidates: &[Candidate]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path).into_app_err_with(|| format!("creating candidate list '{}'", path.display()))?;
    if candidates.is_empty() {
        writer.write_record(CANDIDATE_HEADERS).into_app_err("writing candidate headers")?;
    }
    for candidate in candidates {
        writer.serialize(candidate).into_app_err("writing candidate row")?;
    }
    writer.flush().into_app_err_with(|| format!("flushing '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            name: "shop".into(),
            owner: "acme".into(),
            stars: 321,
            sdk: "6.0.x".into(),
            architecture: Architecture::Mvvm,
            solution_dir: "src".into(),
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("candidates.csv");

        write_candidates(&path, &[candidate()]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Name,Owner,Stars,SDK,Architecture,Solution Directory\n"));
        assert!(text.contains("shop,acme,321,6.0.x,MVVM,src"));

        assert_eq!(read_candidates(&path).unwrap(), vec![candidate()]);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_empty_list_still_has_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.csv");

        write_candidates(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), CANDIDATE_HEADERS.join(","));
        assert!(read_candidates(&path).unwrap().is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_reads_portuguese_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repos.csv");
        fs::write(
            &path,
            "Nome,Proprietário,Estrelas,SDK,Arquitetura,Diretório SLN\nshop,acme,321,6.0.x,MVVM,src\n",
        )
        .unwrap();

        assert_eq!(read_candidates(&path).unwrap(), vec![candidate()]);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let _ = read_candidates(&dir.path().join("missing.csv")).unwrap_err();
    }
}
