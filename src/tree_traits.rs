/*
Rendering lives in a trait so it can be implemented for NodeStore<R> only where R: Display,
without putting a Display bound on the store itself.
 */
use std::fmt::Display;

use termtree::Tree;
use tracing::instrument;

use crate::domain::{NodeId, NodeStore, RowObject};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

// Only expanded nodes contribute children, so the output mirrors what a grid displays.
impl<R: RowObject + Display> TreeNodeConvert for NodeStore<R> {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn label<R: RowObject + Display>(store: &NodeStore<R>, id: NodeId) -> String {
            let text = store
                .payload(id)
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            if !store.children(id).is_empty() && !store.is_expanded(id) {
                format!("{text} [+]")
            } else {
                text
            }
        }

        fn build_tree<R: RowObject + Display>(store: &NodeStore<R>, id: NodeId, parent: &mut Tree<String>) {
            if !store.is_expanded(id) {
                return;
            }
            for &child in store.children(id) {
                let mut child_tree = Tree::new(label(store, child));
                build_tree(store, child, &mut child_tree);
                parent.push(child_tree);
            }
        }

        let root = self.root();
        let mut tree = Tree::new(label(self, root));
        build_tree(self, root, &mut tree);
        tree
    }
}
