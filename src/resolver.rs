use crate::dependency::{Dependency, DependencyKind};
use crate::ident::ModIdent;
use crate::library::ModIndex;
use crate::portal::Portal;
use crate::version::VersionOp;
use std::collections::{HashSet, VecDeque};

/// The outcome of one expansion: the resolved set in first-visit order, and
/// the identifiers that could not be satisfied anywhere. A partial failure
/// never aborts the rest of the expansion; the caller decides whether
/// unresolved entries are fatal.
#[derive(Debug, Default)]
pub struct Resolution {
    pub mods: Vec<ModIdent>,
    pub unresolved: Vec<ModIdent>,
}

/// Expands a seed set of mod identifiers into the full transitive set,
/// consulting the local index first and the registry second.
pub struct Resolver<'a> {
    index: &'a ModIndex,
    portal: &'a mut Portal,
    use_portal: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a ModIndex, portal: &'a mut Portal, use_portal: bool) -> Self {
        Self {
            index,
            portal,
            use_portal,
        }
    }

    /// FIFO worklist expansion. Names are visited at most once: a later,
    /// differently-versioned request for a visited name is dropped. Among
    /// multiple satisfying releases the highest version wins. Only
    /// `Required` and `NoLoadOrder` dependencies of a resolved release are
    /// queued; optional and incompatible edges are never auto-expanded.
    pub fn expand(&mut self, seeds: &[ModIdent]) -> Resolution {
        let mut visited: HashSet<String> = HashSet::new();
        let mut worklist: VecDeque<Dependency> = seeds
            .iter()
            .map(|seed| {
                let op = match seed.version {
                    Some(_) => VersionOp::Eq,
                    None => VersionOp::Any,
                };
                Dependency::required(seed.name.clone(), op, seed.version)
            })
            .collect();
        let mut resolution = Resolution::default();

        while let Some(dep) = worklist.pop_front() {
            if !visited.insert(dep.name.clone()) {
                continue;
            }

            if let Some(release) = self
                .index
                .get(&dep.name)
                .and_then(|entry| entry.matching_release(&dep))
            {
                resolution.mods.push(release.ident());
                queue_children(&mut worklist, &release.dependencies);
                continue;
            }

            // The game's own identity resolves against the installed base
            // version; the registry does not host it.
            if dep.name == "base" {
                if let Some(version) = self.portal.base_version() {
                    resolution.mods.push(ModIdent::new("base", Some(*version)));
                    continue;
                }
            }

            if self.use_portal {
                match self.portal.matching_release(&dep) {
                    Ok(release) => {
                        resolution
                            .mods
                            .push(ModIdent::new(dep.name.clone(), Some(release.version)));
                        queue_children(&mut worklist, &release.info_json.dependencies);
                        continue;
                    }
                    Err(err) => eprintln!("{err}"),
                }
            }

            if dep.kind != DependencyKind::Incompatible {
                resolution
                    .unresolved
                    .push(ModIdent::new(dep.name.clone(), dep.version));
            }
        }

        resolution
    }
}

fn queue_children(worklist: &mut VecDeque<Dependency>, dependencies: &[Dependency]) {
    for dep in dependencies {
        if matches!(
            dep.kind,
            DependencyKind::Required | DependencyKind::NoLoadOrder
        ) {
            worklist.push_back(dep.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::fixtures::release;
    use crate::portal::fixtures::{portal_mod, portal_release};
    use pretty_assertions::assert_eq;

    fn idents(resolution: &Resolution) -> Vec<String> {
        resolution.mods.iter().map(ToString::to_string).collect()
    }

    fn seed(name: &str) -> ModIdent {
        ModIdent::new(name, None)
    }

    #[test]
    fn picks_newest_local_release() {
        let mut index = ModIndex::default();
        index.add_release(release("foo", "1.0.0", &[]));
        index.add_release(release("foo", "1.2.0", &[]));
        let mut portal = Portal::new("http://unused.invalid");

        let resolution = Resolver::new(&index, &mut portal, false).expand(&[seed("foo")]);
        assert_eq!(idents(&resolution), ["foo 1.2.0"]);
        assert!(resolution.unresolved.is_empty());
    }

    #[test]
    fn deduplicates_shared_dependencies() {
        let mut index = ModIndex::default();
        index.add_release(release("A", "1.0.0", &["C"]));
        index.add_release(release("B", "1.0.0", &["C"]));
        index.add_release(release("C", "0.5.0", &[]));
        let mut portal = Portal::new("http://unused.invalid");

        let resolution =
            Resolver::new(&index, &mut portal, false).expand(&[seed("A"), seed("B")]);
        assert_eq!(idents(&resolution), ["A 1.0.0", "B 1.0.0", "C 0.5.0"]);
    }

    #[test]
    fn output_preserves_first_visit_order() {
        let mut index = ModIndex::default();
        index.add_release(release("top", "1.0.0", &["mid", "leaf"]));
        index.add_release(release("mid", "1.0.0", &["leaf"]));
        index.add_release(release("leaf", "1.0.0", &[]));
        let mut portal = Portal::new("http://unused.invalid");

        let resolution = Resolver::new(&index, &mut portal, false).expand(&[seed("top")]);
        assert_eq!(idents(&resolution), ["top 1.0.0", "mid 1.0.0", "leaf 1.0.0"]);
    }

    #[test]
    fn optional_dependencies_are_not_expanded() {
        let mut index = ModIndex::default();
        index.add_release(
            release("A", "1.0.0", &["? opt", "(?) hidden", "! enemy", "~ order", "req"]),
        );
        index.add_release(release("req", "1.0.0", &[]));
        index.add_release(release("order", "1.0.0", &[]));
        index.add_release(release("opt", "1.0.0", &[]));
        let mut portal = Portal::new("http://unused.invalid");

        let resolution = Resolver::new(&index, &mut portal, false).expand(&[seed("A")]);
        assert_eq!(idents(&resolution), ["A 1.0.0", "order 1.0.0", "req 1.0.0"]);
    }

    #[test]
    fn versioned_constraints_select_older_releases() {
        let mut index = ModIndex::default();
        index.add_release(release("A", "1.0.0", &["dep < 2.0"]));
        index.add_release(release("dep", "1.5.0", &[]));
        index.add_release(release("dep", "2.1.0", &[]));
        let mut portal = Portal::new("http://unused.invalid");

        let resolution = Resolver::new(&index, &mut portal, false).expand(&[seed("A")]);
        assert_eq!(idents(&resolution), ["A 1.0.0", "dep 1.5.0"]);
    }

    #[test]
    fn falls_back_to_the_portal() {
        let mut index = ModIndex::default();
        index.add_release(release("A", "1.0.0", &["remote >= 0.2"]));
        let mut portal = Portal::new("http://unused.invalid");
        portal.set_base_version("1.1.87".parse().unwrap());
        portal.seed(portal_mod(
            "remote",
            vec![
                portal_release("0.2.0", &["base >= 1.1", "transitive"]),
                portal_release("0.3.0", &["base >= 2.0"]),
            ],
        ));
        portal.seed(portal_mod("transitive", vec![portal_release("1.0.0", &[])]));

        let resolution = Resolver::new(&index, &mut portal, true).expand(&[seed("A")]);
        assert_eq!(
            idents(&resolution),
            ["A 1.0.0", "remote 0.2.0", "base 1.1.87", "transitive 1.0.0"]
        );
    }

    #[test]
    fn base_resolves_against_installed_version() {
        let mut index = ModIndex::default();
        index.add_release(release("A", "1.0.0", &["base >= 1.1"]));
        let mut portal = Portal::new("http://unused.invalid");
        portal.set_base_version("1.1.87".parse().unwrap());

        let resolution = Resolver::new(&index, &mut portal, false).expand(&[seed("A")]);
        assert_eq!(idents(&resolution), ["A 1.0.0", "base 1.1.87"]);
        assert!(resolution.unresolved.is_empty());
    }

    #[test]
    fn unresolved_entries_do_not_abort_expansion() {
        let mut index = ModIndex::default();
        index.add_release(release("A", "1.0.0", &["missing", "present"]));
        index.add_release(release("present", "1.0.0", &[]));
        let mut portal = Portal::new("http://unused.invalid");

        let resolution = Resolver::new(&index, &mut portal, false).expand(&[seed("A")]);
        assert_eq!(idents(&resolution), ["A 1.0.0", "present 1.0.0"]);
        assert_eq!(resolution.unresolved.len(), 1);
        assert_eq!(resolution.unresolved[0].name, "missing");
    }

    #[test]
    fn second_request_for_a_visited_name_is_dropped() {
        let mut index = ModIndex::default();
        index.add_release(release("A", "1.0.0", &["C = 1.0"]));
        index.add_release(release("B", "1.0.0", &["C = 2.0"]));
        index.add_release(release("C", "1.0.0", &[]));
        index.add_release(release("C", "2.0.0", &[]));
        let mut portal = Portal::new("http://unused.invalid");

        // Dedup is by name only; B's conflicting request for C is ignored.
        let resolution =
            Resolver::new(&index, &mut portal, false).expand(&[seed("A"), seed("B")]);
        assert_eq!(idents(&resolution), ["A 1.0.0", "B 1.0.0", "C 1.0.0"]);
    }
}
