//! Remapping from COCO paper categories to compact class indexes.

use crate::common::*;

/// The immutable category lookup built from a pair of names files.
///
/// The COCO paper lists 91 categories while the released annotations use 80
/// of them. A COCO `category_id` is the 1-based paper index.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    paper_to_class: HashMap<usize, usize>,
    class_names: IndexSet<String>,
}

impl CategoryMap {
    pub fn load<P1, P2>(paper_names_file: P1, dataset_names_file: P2) -> Result<Self>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let paper_names = load_names_file(paper_names_file)?;
        let class_names = load_names_file(dataset_names_file)?;
        Self::from_names(paper_names, class_names)
    }

    pub fn from_names(paper_names: IndexSet<String>, class_names: IndexSet<String>) -> Result<Self> {
        let paper_to_class: HashMap<_, _> = class_names
            .iter()
            .enumerate()
            .map(|(class_index, name)| {
                let paper_index = paper_names.get_index_of(name).ok_or_else(|| {
                    format_err!("the class '{}' is not a paper category", name)
                })?;
                Ok((paper_index, class_index))
            })
            .collect::<Result<_>>()?;

        info!(
            "{} of {} paper categories are trained",
            class_names.len(),
            paper_names.len()
        );

        Ok(Self {
            paper_to_class,
            class_names,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// The class index of a 0-based paper index.
    pub fn class_index(&self, paper_index: usize) -> Option<usize> {
        self.paper_to_class.get(&paper_index).copied()
    }

    /// The class index of a 1-based COCO `category_id`.
    pub fn class_of_category_id(&self, category_id: usize) -> Option<usize> {
        category_id
            .checked_sub(1)
            .and_then(|paper_index| self.class_index(paper_index))
    }

    pub fn class_name(&self, class_index: usize) -> Option<&str> {
        self.class_names
            .get_index(class_index)
            .map(|name| name.as_str())
    }

    pub fn class_names(&self) -> &IndexSet<String> {
        &self.class_names
    }
}

/// Read a newline-delimited names file. Empty or duplicated names are errors.
pub fn load_names_file<P>(path: P) -> Result<IndexSet<String>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read names file '{}'", path.display()))?;
    let lines: Vec<_> = content.lines().map(str::trim).collect();
    ensure!(
        lines.iter().all(|line| !line.is_empty()),
        "empty class name found in '{}'",
        path.display()
    );
    let duplicates = lines.iter().duplicates().collect_vec();
    ensure!(
        duplicates.is_empty(),
        "duplicated class names {:?} found in '{}'",
        duplicates,
        path.display()
    );
    let names: IndexSet<_> = lines.iter().map(|&name| name.to_owned()).collect();
    ensure!(!names.is_empty(), "no classes found in '{}'", path.display());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> IndexSet<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn remap_skips_untrained_categories() {
        let map = CategoryMap::from_names(
            names(&["person", "bicycle", "street sign", "stop sign"]),
            names(&["person", "bicycle", "stop sign"]),
        )
        .unwrap();

        assert_eq!(map.num_classes(), 3);
        assert_eq!(map.class_index(3), Some(2));
        assert_eq!(map.class_index(2), None);
        assert_eq!(map.class_of_category_id(4), Some(2));
        assert_eq!(map.class_of_category_id(0), None);
        assert_eq!(map.class_name(2), Some("stop sign"));
        assert_eq!(map.class_name(3), None);
    }

    #[test]
    fn names_file_is_checked() {
        let dir = std::env::temp_dir().join(format!("tiny-yolo-names-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.names");
        std::fs::write(&good, "person\n bicycle \ncar\n").unwrap();
        let names = load_names_file(&good).unwrap();
        assert_eq!(names.get_index_of("bicycle"), Some(1));

        let duplicated = dir.join("duplicated.names");
        std::fs::write(&duplicated, "person\ncar\nperson\n").unwrap();
        assert!(load_names_file(&duplicated).is_err());

        let blank = dir.join("blank.names");
        std::fs::write(&blank, "person\n\ncar\n").unwrap();
        assert!(load_names_file(&blank).is_err());

        assert!(load_names_file(dir.join("missing.names")).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_class_is_fatal() {
        let result =
            CategoryMap::from_names(names(&["person", "bicycle"]), names(&["person", "motorbike"]));
        assert!(result.is_err());
    }
}
