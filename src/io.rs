use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CastlesError, Result};
use crate::gene_trees::GeneTrees;
use crate::species_tree::SpeciesTree;

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Read a whole text file. If `path` ends with `.gz`, it is decompressed.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let p = path.as_ref();
    let read_err = |source| CastlesError::Read {
        path: p.to_path_buf(),
        source,
    };

    let file = File::open(p).map_err(read_err)?;
    let mut content = String::new();
    if is_gz(p) {
        MultiGzDecoder::new(file)
            .read_to_string(&mut content)
            .map_err(read_err)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut content).map_err(read_err)?;
    }
    Ok(content)
}

/// Read the annotated species tree.
pub fn read_species_tree<P: AsRef<Path>>(path: P) -> Result<SpeciesTree> {
    SpeciesTree::from_newick(&read_text(path)?)
}

/// Read all gene trees from one newick file.
pub fn read_gene_trees<P: AsRef<Path>>(path: P) -> Result<GeneTrees> {
    let content = read_text(path.as_ref())?;
    GeneTrees::from_newick(&content).map_err(|e| match e {
        CastlesError::NoGeneTrees(_) => {
            CastlesError::NoGeneTrees(path.as_ref().display().to_string())
        }
        other => other,
    })
}

/// Write a serialized tree followed by a newline.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// The file is only created once `newick` is complete, so failed runs leave
/// nothing behind.
pub fn write_newick<P: AsRef<Path>>(path: P, newick: &str) -> Result<()> {
    let p = path.as_ref();
    let write_err = |source| CastlesError::Write {
        path: p.to_path_buf(),
        source,
    };

    let file = File::create(p).map_err(write_err)?;
    let mut out: Box<dyn Write> = if is_gz(p) {
        Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(BufWriter::new(file))
    };

    writeln!(&mut out, "{newick}").map_err(write_err)?;
    out.flush().map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    #[test]
    fn plain_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.nwk");
        write_newick(&path, "(A:1.0,B:2.0);").unwrap();
        assert_eq!(read_text(&path).unwrap(), "(A:1.0,B:2.0);\n");
    }

    #[test]
    fn gz_output_is_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.nwk.gz");
        write_newick(&path, "(A:1.0,B:2.0);").unwrap();

        let mut raw = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut raw)
            .unwrap();
        assert_eq!(raw, "(A:1.0,B:2.0);\n");
        assert_eq!(read_text(&path).unwrap(), raw);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_species_tree("/nonexistent/species.tre").unwrap_err();
        assert!(matches!(err, CastlesError::Read { .. }));
        assert!(err.to_string().contains("species.tre"));
    }

    #[test]
    fn empty_gene_tree_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.tre");
        std::fs::write(&path, "\n").unwrap();
        match read_gene_trees(&path) {
            Err(CastlesError::NoGeneTrees(name)) => assert!(name.ends_with("genes.tre")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
