use std::sync::Arc;

use dx_core::ProjectIdentity;
use sha2::{Digest, Sha256};

/// Per-file identity allocator.
///
/// Identifiers are `"{file_digest}-{serial}"`, where the digest covers the
/// project identity, the package and the file name, so the same input always
/// yields the same identifiers. The serial starts at 1 and is shared by
/// containers and leaves.
pub struct LocationTracker {
    identity: Arc<ProjectIdentity>,
    file_name: String,
    package_name: Option<String>,
    file_digest: Option<String>,
    package_digest: Option<String>,
    containers: Vec<String>,
    types: Vec<String>,
    serial: u64,
}

fn digest(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

impl LocationTracker {
    pub fn new(identity: Arc<ProjectIdentity>, file_name: impl Into<String>) -> Self {
        Self {
            identity,
            file_name: file_name.into(),
            package_name: None,
            file_digest: None,
            package_digest: None,
            containers: Vec::new(),
            types: Vec::new(),
            serial: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Package of the file, or the empty string for the default package.
    pub fn package_name(&self) -> &str {
        self.package_name.as_deref().unwrap_or("")
    }

    /// Sets the package once. Later calls, or a call after an identifier has
    /// already been derived, are ignored with a warning.
    pub fn set_package(&mut self, package_name: &str) {
        if self.package_name.is_some() || self.file_digest.is_some() {
            tracing::warn!(
                file = %self.file_name,
                package = package_name,
                "package already fixed for file, ignoring"
            );
            return;
        }
        self.package_name = Some(package_name.to_string());
    }

    pub fn file_digest(&mut self) -> &str {
        if self.file_digest.is_none() {
            let input = format!(
                "{} {} {} {}",
                self.identity.name,
                self.identity.version,
                self.package_name(),
                self.file_name
            );
            self.file_digest = Some(digest(&input));
        }
        self.file_digest.as_deref().unwrap_or_default()
    }

    /// Root identifier for declarations outside any container.
    pub fn package_digest(&mut self) -> &str {
        if self.package_digest.is_none() {
            let input = format!("{} {}", self.identity.name, self.package_name());
            self.package_digest = Some(digest(&input));
        }
        self.package_digest.as_deref().unwrap_or_default()
    }

    fn next_id(&mut self) -> String {
        self.serial += 1;
        let serial = self.serial;
        format!("{}-{}", self.file_digest(), serial)
    }

    pub fn push_container(&mut self) -> String {
        let id = self.next_id();
        self.containers.push(id.clone());
        id
    }

    pub fn pop(&mut self) {
        if self.containers.pop().is_none() {
            tracing::warn!(file = %self.file_name, "container stack underflow");
        }
    }

    pub fn leaf_id(&mut self) -> String {
        self.next_id()
    }

    /// Top of the container stack, falling back to the package root.
    pub fn current_container_id(&mut self) -> String {
        match self.containers.last() {
            Some(id) => id.clone(),
            None => self.package_digest().to_string(),
        }
    }

    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    pub fn push_type(&mut self, name: &str) {
        self.types.push(name.to_string());
    }

    pub fn pop_type(&mut self, name: &str) {
        match self.types.pop() {
            Some(top) if top == name => {}
            Some(top) => tracing::warn!(
                file = %self.file_name,
                expected = name,
                found = %top,
                "type stack mismatch"
            ),
            None => tracing::warn!(
                file = %self.file_name,
                expected = name,
                "type stack underflow"
            ),
        }
    }

    /// Dotted name of the innermost type being declared, qualified with the
    /// package when there is one (`pkg.Outer.Inner`).
    pub fn qualified_type_name(&self) -> Option<String> {
        if self.types.is_empty() {
            return None;
        }
        let nested = self.types.join(".");
        Some(match self.package_name() {
            "" => nested,
            pkg => format!("{pkg}.{nested}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LocationTracker {
        let mut t = LocationTracker::new(
            Arc::new(ProjectIdentity::new("demo", "1.0")),
            "Foo.java",
        );
        t.set_package("org.example");
        t
    }

    #[test]
    fn ids_are_serial_and_file_scoped() {
        let mut t = tracker();
        let digest = t.file_digest().to_string();
        assert_eq!(digest.len(), 64);

        let outer = t.push_container();
        let leaf = t.leaf_id();
        assert_eq!(outer, format!("{digest}-1"));
        assert_eq!(leaf, format!("{digest}-2"));
        assert_eq!(t.current_container_id(), outer);
    }

    #[test]
    fn same_input_gives_same_digest() {
        let mut a = tracker();
        let mut b = tracker();
        assert_eq!(a.file_digest(), b.file_digest());

        let mut other = LocationTracker::new(
            Arc::new(ProjectIdentity::new("demo", "2.0")),
            "Foo.java",
        );
        other.set_package("org.example");
        assert_ne!(a.file_digest(), other.file_digest());
    }

    #[test]
    fn empty_stack_falls_back_to_package_root() {
        let mut t = tracker();
        let root = t.package_digest().to_string();
        assert_eq!(t.current_container_id(), root);

        t.push_container();
        t.pop();
        assert_eq!(t.current_container_id(), root);
        t.pop();
        assert_eq!(t.depth(), 0);
    }

    #[test]
    fn package_is_set_once() {
        let mut t = tracker();
        t.set_package("other");
        assert_eq!(t.package_name(), "org.example");
    }

    #[test]
    fn qualified_type_name_nests() {
        let mut t = tracker();
        assert_eq!(t.qualified_type_name(), None);
        t.push_type("Outer");
        t.push_type("Inner");
        assert_eq!(t.qualified_type_name().as_deref(), Some("org.example.Outer.Inner"));
        t.pop_type("Inner");
        t.pop_type("Wrong");
        assert_eq!(t.qualified_type_name(), None);

        let mut bare = LocationTracker::new(Arc::new(ProjectIdentity::new("p", "v")), "A.java");
        bare.push_type("A");
        assert_eq!(bare.qualified_type_name().as_deref(), Some("A"));
    }
}
