use ahash::AHashMap;
use log::debug;

use crate::reconstruct::players::MapInfo;
use crate::reconstruct::records::{ObjectRecord, ReconstructedObjects, Record, RecordKind};
use crate::script::{NodeData, NodeId, ScriptTree};

#[derive(Debug, Clone, Copy)]
struct FunctionEntry {
    declaration: NodeId,
    expanded: bool,
}

/// State of one reconstruction pass.
///
/// Records live in an append-only arena. Variable bindings and the
/// "last created of each kind" index point into it; they never own
/// records, and records are never removed.
#[derive(Debug)]
pub struct ReconstructionContext {
    map_info: MapInfo,
    records: Vec<ObjectRecord>,
    by_variable: AHashMap<String, usize>,
    last_by_kind: AHashMap<RecordKind, usize>,
    functions: AHashMap<String, FunctionEntry>,
    assignments: AHashMap<String, NodeId>,
    creation_counter: u32,
}

impl ReconstructionContext {
    /// Index every top-level function of `tree`
    pub fn new(tree: &ScriptTree, map_info: MapInfo) -> Self {
        let mut functions = AHashMap::new();
        for (name, declaration) in tree.function_declarations() {
            // a later redefinition replaces the earlier one, as at runtime
            functions.insert(
                name.to_string(),
                FunctionEntry {
                    declaration,
                    expanded: false,
                },
            );
        }
        debug!("Indexed {} script functions", functions.len());

        Self {
            map_info,
            records: Vec::new(),
            by_variable: AHashMap::new(),
            last_by_kind: AHashMap::new(),
            functions,
            assignments: AHashMap::new(),
            creation_counter: 0,
        }
    }

    pub fn map_info(&self) -> &MapInfo {
        &self.map_info
    }

    /// Next value of the monotonic creation counter
    pub fn next_creation_number(&mut self) -> u32 {
        let number = self.creation_counter;
        self.creation_counter += 1;
        number
    }

    /// Store `record`, stamping its creation number, and bind it to
    /// `variable` when given. Returns its arena index.
    pub fn add<T: Record>(&mut self, mut record: T, variable: Option<&str>) -> usize {
        let number = self.next_creation_number();
        record.set_creation_number(number);

        let index = self.records.len();
        self.records.push(record.wrap());
        self.last_by_kind.insert(T::KIND, index);
        if let Some(variable) = variable {
            self.by_variable.insert(variable.to_string(), index);
        }
        index
    }

    pub fn get<T: Record>(&self, variable: &str) -> Option<&T> {
        let index = *self.by_variable.get(variable)?;
        T::view(&self.records[index])
    }

    pub fn get_mut<T: Record>(&mut self, variable: &str) -> Option<&mut T> {
        let index = *self.by_variable.get(variable)?;
        T::view_mut(&mut self.records[index])
    }

    pub fn last_created<T: Record>(&self) -> Option<&T> {
        let index = *self.last_by_kind.get(&T::KIND)?;
        T::view(&self.records[index])
    }

    pub fn last_created_mut<T: Record>(&mut self) -> Option<&mut T> {
        let index = *self.last_by_kind.get(&T::KIND)?;
        T::view_mut(&mut self.records[index])
    }

    /// Record bound to `variable`, or the most recently created `T` when the
    /// variable is missing, unbound or bound to another kind
    pub fn resolve_mut<T: Record>(&mut self, variable: Option<&str>) -> Option<&mut T> {
        let bound = variable
            .and_then(|name| self.by_variable.get(name))
            .copied()
            .filter(|&index| self.records[index].kind() == T::KIND);

        let index = match bound {
            Some(index) => index,
            None => *self.last_by_kind.get(&T::KIND)?,
        };
        T::view_mut(&mut self.records[index])
    }

    pub fn records(&self) -> &[ObjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Declaration of `name` the first time it is asked for; `None` when the
    /// function is unknown or was already expanded
    pub fn begin_expansion(&mut self, name: &str) -> Option<NodeId> {
        let entry = self.functions.get_mut(name)?;
        if entry.expanded {
            return None;
        }
        entry.expanded = true;
        Some(entry.declaration)
    }

    /// Remember the expression last assigned to a plain variable
    pub fn bind_value(&mut self, variable: &str, value: NodeId) {
        self.assignments.insert(variable.to_string(), value);
    }

    /// Bind each plain variable of an assignment or local statement to the
    /// expression in the same position
    pub fn track_assignment(&mut self, tree: &ScriptTree, statement: NodeId) {
        let (NodeData::AssignmentStatement { variables, init } | NodeData::LocalStatement { variables, init }) =
            tree.data(statement)
        else {
            return;
        };
        for (&variable, &value) in variables.iter().zip(init) {
            if let Some(name) = tree.identifier_name(variable) {
                self.bind_value(name, value);
            }
        }
    }

    pub fn value_of(&self, variable: &str) -> Option<NodeId> {
        self.assignments.get(variable).copied()
    }

    pub fn into_objects(self) -> ReconstructedObjects {
        ReconstructedObjects::from_records(self.records)
    }
}
