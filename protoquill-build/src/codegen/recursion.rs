//! Finds the message fields that must be boxed.
//!
//! A message that contains itself, directly or through other messages, has
//! no finite size unless some field on the cycle is a pointer:
//!
//! ```protobuf
//! message Expr {
//!   Expr lhs = 1;          // Option<Box<Expr>>
//!   repeated Expr args = 2; // Vec<Expr>, already on the heap
//!   Call call = 3;         // Option<Box<Call>>
//! }
//! message Call {
//!   Expr callee = 1;       // Option<Box<Expr>>
//! }
//! ```
//!
//! Messages are grouped into strongly connected components over their
//! singular message fields (oneof members included). Every such field whose
//! target lies in the same component as its owner is boxed.

use std::collections::{HashMap, HashSet};

use crate::descriptor::{DescriptorProto, FileDescriptorSet, Type};

/// A field that needs to be boxed to break a recursive cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecursiveField {
    /// Fully-qualified name of the containing message, e.g. `.shop.Hat`.
    pub message_fqn: String,
    pub field_name: String,
}

/// Returns every field of `fds` that closes a cycle of inline messages.
pub fn find_recursive_fields(fds: &FileDescriptorSet) -> HashSet<RecursiveField> {
    let mut graph = Graph::default();
    for file in &fds.file {
        let prefix = file.type_prefix();
        for message in &file.message_type {
            graph.add_message(&prefix, message);
        }
    }

    let component = Components::of(&graph);
    let mut boxed = HashSet::new();
    for (node, edges) in graph.edges.iter().enumerate() {
        for edge in edges {
            let Some(&target) = graph.index.get(&edge.target) else {
                continue;
            };
            if component[node] == component[target] {
                boxed.insert(RecursiveField {
                    message_fqn: graph.names[node].clone(),
                    field_name: edge.field.clone(),
                });
            }
        }
    }
    boxed
}

#[derive(Debug)]
struct Edge {
    field: String,
    target: String,
}

/// Messages and the inline message fields between them.
#[derive(Debug, Default)]
struct Graph {
    index: HashMap<String, usize>,
    names: Vec<String>,
    edges: Vec<Vec<Edge>>,
}

impl Graph {
    fn add_message(&mut self, prefix: &str, message: &DescriptorProto) {
        let Some(name) = &message.name else {
            return;
        };
        let fqn = format!("{prefix}{name}");

        let edges = message
            .field
            .iter()
            .filter(|field| field.field_type() == Some(Type::Message) && !field.is_repeated())
            .filter_map(|field| {
                Some(Edge {
                    field: field.name.clone()?,
                    target: field.type_name.clone()?,
                })
            })
            .collect();

        self.index.insert(fqn.clone(), self.names.len());
        self.names.push(fqn.clone());
        self.edges.push(edges);

        // Map entries only hang off repeated fields.
        let prefix = format!("{fqn}.");
        for nested in message.nested_type.iter().filter(|n| !n.is_map_entry()) {
            self.add_message(&prefix, nested);
        }
    }

    fn targets(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges[node]
            .iter()
            .filter_map(|edge| self.index.get(&edge.target).copied())
    }
}

/// Tarjan's strongly connected components.
struct Components<'g> {
    graph: &'g Graph,
    next_index: usize,
    index: Vec<Option<usize>>,
    low_link: Vec<usize>,
    stack: Vec<usize>,
    on_stack: Vec<bool>,
    component: Vec<usize>,
    count: usize,
}

impl<'g> Components<'g> {
    /// Component id of every node of `graph`.
    fn of(graph: &'g Graph) -> Vec<usize> {
        let nodes = graph.names.len();
        let mut components = Components {
            graph,
            next_index: 0,
            index: vec![None; nodes],
            low_link: vec![0; nodes],
            stack: Vec::new(),
            on_stack: vec![false; nodes],
            component: vec![0; nodes],
            count: 0,
        };
        for node in 0..nodes {
            if components.index[node].is_none() {
                components.visit(node);
            }
        }
        components.component
    }

    fn visit(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.low_link[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        let targets: Vec<usize> = self.graph.targets(node).collect();
        for target in targets {
            match self.index[target] {
                None => {
                    self.visit(target);
                    self.low_link[node] = self.low_link[node].min(self.low_link[target]);
                }
                Some(index) if self.on_stack[target] => {
                    self.low_link[node] = self.low_link[node].min(index);
                }
                Some(_) => {}
            }
        }

        if Some(self.low_link[node]) == self.index[node] {
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                self.component[member] = self.count;
                if member == node {
                    break;
                }
            }
            self.count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::builder::*;

    fn recursive(messages: Vec<DescriptorProto>) -> HashSet<RecursiveField> {
        let file = messages
            .into_iter()
            .fold(FileDescriptorProto::new("test.proto", "test"), |file, m| {
                file.with_message(m)
            });
        find_recursive_fields(&FileDescriptorSet { file: vec![file] })
    }

    fn boxed(message_fqn: &str, field_name: &str) -> RecursiveField {
        RecursiveField {
            message_fqn: message_fqn.to_string(),
            field_name: field_name.to_string(),
        }
    }

    #[test]
    fn test_self_reference() {
        let node = DescriptorProto::new("Node")
            .with_field(FieldDescriptorProto::message("child", 1, ".test.Node"))
            .with_field(FieldDescriptorProto::message("children", 2, ".test.Node").repeated());

        let recursive = recursive(vec![node]);
        assert_eq!(recursive, HashSet::from([boxed(".test.Node", "child")]));
    }

    #[test]
    fn test_mutual_recursion_boxes_both_sides() {
        let recursive = recursive(vec![
            DescriptorProto::new("A").with_field(FieldDescriptorProto::message("b", 1, ".test.B")),
            DescriptorProto::new("B").with_field(FieldDescriptorProto::message("a", 1, ".test.A")),
        ]);
        assert_eq!(
            recursive,
            HashSet::from([boxed(".test.A", "b"), boxed(".test.B", "a")])
        );
    }

    #[test]
    fn test_edge_into_cycle_is_not_boxed() {
        // Outer -> Ping <-> Pong
        let recursive = recursive(vec![
            DescriptorProto::new("Outer")
                .with_field(FieldDescriptorProto::message("ping", 1, ".test.Ping")),
            DescriptorProto::new("Ping")
                .with_field(FieldDescriptorProto::message("pong", 1, ".test.Pong")),
            DescriptorProto::new("Pong")
                .with_field(FieldDescriptorProto::message("ping", 1, ".test.Ping")),
        ]);
        assert!(!recursive.contains(&boxed(".test.Outer", "ping")));
        assert!(recursive.contains(&boxed(".test.Ping", "pong")));
        assert!(recursive.contains(&boxed(".test.Pong", "ping")));
    }

    #[test]
    fn test_oneof_member() {
        let expr = DescriptorProto::new("Expr").with_oneof(
            "kind",
            vec![
                FieldDescriptorProto::message("negate", 1, ".test.Expr"),
                FieldDescriptorProto::scalar("literal", 2, Type::Int32),
            ],
        );

        let recursive = recursive(vec![expr]);
        assert_eq!(recursive, HashSet::from([boxed(".test.Expr", "negate")]));
    }

    #[test]
    fn test_nested_message_cycle() {
        let tree = DescriptorProto::new("Tree").with_nested(
            DescriptorProto::new("Branch")
                .with_field(FieldDescriptorProto::message("tree", 1, ".test.Tree")),
        );
        let tree = tree.with_field(FieldDescriptorProto::message("branch", 1, ".test.Tree.Branch"));

        let recursive = recursive(vec![tree]);
        assert!(recursive.contains(&boxed(".test.Tree", "branch")));
        assert!(recursive.contains(&boxed(".test.Tree.Branch", "tree")));
    }

    #[test]
    fn test_acyclic() {
        let recursive = recursive(vec![
            DescriptorProto::new("A").with_field(FieldDescriptorProto::message("b", 1, ".test.B")),
            DescriptorProto::new("B").with_field(FieldDescriptorProto::scalar("x", 1, Type::Int32)),
        ]);
        assert!(recursive.is_empty());
    }
}
