//! The owner of class metadata.
//!
//! A [`ClassTable`] allocates one dispatch vector and one contiguous run of
//! interface nodes per loaded class. Both are linked once, when the class is
//! loaded, and are never mutated or freed while any handle to the table
//! exists. Instances created through [`crate::instance`] borrow the table, so
//! an instance can never outlive the dispatch vector it points to.
//!
//! ```rust
//! use objlayout::{ClassDefinition, ClassTable};
//!
//! let table = ClassTable::new();
//! let dog = table
//!     .load(
//!         ClassDefinition::object("Dog")
//!             .implements("Animal")
//!             .implements("Pet"),
//!     )
//!     .unwrap();
//!
//! let dog = table.class(dog).unwrap();
//! assert!(dog.implements_interface(c"Pet"));
//! assert!(!dog.implements_interface(c"Vehicle"));
//! ```

use alloc::{ffi::CString, format, string::String, vec::Vec};
use core::ffi::CStr;

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use objlayout_internals::{
    DispatchVector, Interfaces, RawClass, RawClassRef, RawDispatchVectorRef,
};
use rootcause::{Report, report};
use rustc_hash::FxBuildHasher;
use triomphe::Arc;

use crate::{
    LayoutError, LayoutResult,
    config::LayoutConfig,
    lock::RwLock,
    type_info::{ElementType, TypeInfo, TypeKind},
};

/// Name of the root class preloaded by [`ClassTable::with_builtins`].
pub const OBJECT_CLASS: &str = "java.lang.Object";
/// Name of the string class preloaded by [`ClassTable::with_builtins`].
pub const STRING_CLASS: &str = "java.lang.String";

/// Interfaces of the builtin string class.
const STRING_INTERFACES: [&str; 3] = [
    "java.lang.CharSequence",
    "java.lang.Comparable",
    "java.io.Serializable",
];
/// Interfaces of every builtin array class.
const ARRAY_INTERFACES: [&str; 2] = ["java.lang.Cloneable", "java.io.Serializable"];

/// Identifies a class within the [`ClassTable`] that loaded it.
///
/// Ids are assigned in load order, starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("#{_0}")]
pub struct ClassId(usize);

impl ClassId {
    /// The position of the class in load order.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Description of a class to be loaded into a [`ClassTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    /// The class name.
    name: String,
    /// The kind of instances the class describes.
    kind: TypeKind,
    /// Interface names, in the order they are linked.
    interfaces: Vec<String>,
}

impl ClassDefinition {
    /// A class of plain objects.
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name.into(), TypeKind::Object)
    }

    /// An array class with the given element type.
    pub fn array(name: impl Into<String>, element: ElementType) -> Self {
        Self::new(name.into(), TypeKind::Array(element))
    }

    /// An array class named by its JVM descriptor, such as `[I`.
    pub fn primitive_array(element: ElementType) -> Self {
        Self::array(element.array_descriptor(), element)
    }

    /// A string class.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name.into(), TypeKind::String)
    }

    /// A class without interfaces.
    fn new(name: String, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            interfaces: Vec::new(),
        }
    }

    /// Adds an interface to the class.
    ///
    /// Interfaces are linked in the order they are added.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Adds several interfaces to the class, in iteration order.
    #[must_use]
    pub fn implements_all(
        mut self,
        interfaces: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.interfaces.extend(interfaces.into_iter().map(Into::into));
        self
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of instances the class describes.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// The interfaces added so far, in order.
    pub fn interfaces(&self) -> impl ExactSizeIterator<Item = &str> {
        self.interfaces.iter().map(String::as_str)
    }
}

/// The classes of a table, guarded by its lock.
struct Classes {
    /// Every class, keyed by name. The index of an entry is its [`ClassId`].
    by_name: IndexMap<CString, RawClass, FxBuildHasher>,
    /// Class ids keyed by the address of their dispatch vector.
    by_dispatch_vector: HashMap<usize, ClassId, FxBuildHasher>,
}

/// A shared handle to a set of loaded classes.
///
/// Cloning the handle is cheap and every clone sees the same classes. Classes
/// can only be added, so metadata handed out by one handle stays valid for as
/// long as that handle is borrowed.
#[derive(Clone)]
pub struct ClassTable {
    /// The classes, shared by every clone of the handle.
    classes: Arc<RwLock<Classes>>,
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            classes: Arc::new(RwLock::new(Classes {
                by_name: IndexMap::with_hasher(FxBuildHasher),
                by_dispatch_vector: HashMap::with_hasher(FxBuildHasher),
            })),
        }
    }

    /// Creates a table holding `java.lang.Object`, `java.lang.String` and the
    /// eight primitive array classes.
    ///
    /// # Errors
    ///
    /// Fails with [`LayoutError::MalformedMetadata`] if the installed
    /// configuration allows fewer interfaces per class than the builtin
    /// classes declare.
    pub fn with_builtins() -> LayoutResult<Self> {
        let table = Self::new();
        table.load(ClassDefinition::object(OBJECT_CLASS))?;
        let string = ClassDefinition::string(STRING_CLASS).implements_all(STRING_INTERFACES);
        table.load(string)?;
        for element in ElementType::ALL {
            let array = ClassDefinition::primitive_array(element);
            table.load(array.implements_all(ARRAY_INTERFACES))?;
        }
        Ok(table)
    }

    /// Loads a class and links its metadata.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::InvalidArgument`] if the class name or an interface
    ///   name is empty or contains a NUL byte.
    /// - [`LayoutError::MalformedMetadata`] if an interface is listed twice or
    ///   the class lists more interfaces than the configured bound.
    /// - [`LayoutError::DuplicateClass`] if a class of the same name is
    ///   already loaded.
    pub fn load(&self, definition: ClassDefinition) -> LayoutResult<ClassId> {
        let ClassDefinition {
            name,
            kind,
            interfaces,
        } = definition;
        let name = checked_name(name, "class")?;

        let limit = LayoutConfig::current().max_interface_chain();
        let count = interfaces.len();
        if count > limit {
            tracing::warn!(class = ?name, count, limit, "too many interfaces");
            return Err(report!(LayoutError::MalformedMetadata)
                .attach(format!("class {name:?} lists {count} interfaces"))
                .attach(format!("at most {limit} are allowed")));
        }

        {
            let mut seen = HashSet::with_capacity_and_hasher(count, FxBuildHasher);
            for interface in &interfaces {
                if !seen.insert(interface.as_str()) {
                    let interface = interface.as_str();
                    tracing::warn!(class = ?name, interface, "interface listed twice");
                    return Err(report!(LayoutError::MalformedMetadata)
                        .attach(format!("class {name:?} lists {interface:?} twice")));
                }
            }
        }

        let interfaces = interfaces
            .into_iter()
            .map(|interface| checked_name(interface, "interface"))
            .collect::<LayoutResult<Vec<_>>>()?;

        let mut classes = self.classes.write();
        if classes.by_name.contains_key(name.as_c_str()) {
            return Err(report!(LayoutError::DuplicateClass).attach(format!("{name:?}")));
        }

        let id = ClassId(classes.by_name.len());
        let class = RawClass::new(interfaces, TypeInfo::new(name.clone(), id, kind));
        let address = class.as_ref().dispatch_vector().as_ptr().addr();

        tracing::debug!(class = ?name, %id, ?kind, interface_count = count, "loaded class");

        classes.by_dispatch_vector.insert(address, id);
        classes.by_name.insert(name, class);
        Ok(id)
    }

    /// Looks up a class by id.
    pub fn class(&self, id: ClassId) -> Option<ClassRef<'_>> {
        let classes = self.classes.read();
        let (_, class) = classes.by_name.get_index(id.0)?;
        Some(self.class_ref(class))
    }

    /// Looks up a class by name.
    pub fn class_by_name(&self, name: &CStr) -> Option<ClassRef<'_>> {
        let classes = self.classes.read();
        let class = classes.by_name.get(name)?;
        Some(self.class_ref(class))
    }

    /// Looks up a class by a name given as UTF-8.
    ///
    /// Names containing a NUL byte are never loaded and yield `None`.
    pub fn class_by_str(&self, name: &str) -> Option<ClassRef<'_>> {
        let name = CString::new(name).ok()?;
        self.class_by_name(&name)
    }

    /// Finds the class whose dispatch vector is at `dispatch_vector`.
    ///
    /// The pointer is only compared, never read, so any pointer may be
    /// passed. Dispatch vectors that this table did not create yield `None`.
    pub fn class_of_dispatch_vector(
        &self,
        dispatch_vector: *const DispatchVector,
    ) -> Option<ClassRef<'_>> {
        let classes = self.classes.read();
        let id = *classes.by_dispatch_vector.get(&dispatch_vector.addr())?;
        let (_, class) = classes.by_name.get_index(id.0)?;
        Some(self.class_ref(class))
    }

    /// The number of loaded classes.
    pub fn len(&self) -> usize {
        self.classes.read().by_name.len()
    }

    /// Whether no class has been loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the classes loaded so far, in load order.
    ///
    /// Classes loaded while iterating are not included.
    pub fn iter(&self) -> alloc::vec::IntoIter<ClassRef<'_>> {
        let classes = self.classes.read();
        classes
            .by_name
            .values()
            .map(|class| self.class_ref(class))
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Borrows `class`, which must belong to this table, for as long as
    /// `self` is borrowed.
    fn class_ref(&self, class: &RawClass) -> ClassRef<'_> {
        // SAFETY: Classes are never removed from the table, and the table is
        // only dropped once every handle is gone. `self` is borrowed for the
        // returned lifetime, so the class outlives it.
        let raw = unsafe { class.as_ref_unbounded() };
        ClassRef::new(raw)
    }
}

impl<'t> IntoIterator for &'t ClassTable {
    type Item = ClassRef<'t>;
    type IntoIter = alloc::vec::IntoIter<ClassRef<'t>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl core::fmt::Debug for ClassTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Converts a class or interface name to a C string, rejecting empty names
/// and names containing NUL.
fn checked_name(name: String, what: &'static str) -> LayoutResult<CString> {
    if name.is_empty() {
        return Err(report!(LayoutError::InvalidArgument).attach(format!("empty {what} name")));
    }
    CString::new(name).map_err(|error| -> Report<LayoutError> {
        let position = error.nul_position();
        let name = String::from_utf8_lossy(&error.into_vec()).into_owned();
        let message = format!("{what} name {name:?} contains a NUL byte at {position}");
        report!(LayoutError::InvalidArgument).attach(message)
    })
}

/// A loaded class, borrowed from its [`ClassTable`].
#[derive(Clone, Copy)]
pub struct ClassRef<'t> {
    /// The class allocation.
    raw: RawClassRef<'t>,
    /// The type information stored in the allocation.
    type_info: &'t TypeInfo,
}

impl<'t> ClassRef<'t> {
    /// Wraps a class allocation of a [`ClassTable`].
    fn new(raw: RawClassRef<'t>) -> Self {
        // SAFETY: Every class in a table is created with a `TypeInfo`.
        let type_info = unsafe { raw.type_info_downcast_unchecked::<TypeInfo>() };
        Self { raw, type_info }
    }

    /// The class id.
    pub fn id(self) -> ClassId {
        self.type_info.id()
    }

    /// The class name.
    pub fn name(self) -> &'t CStr {
        self.type_info.name()
    }

    /// The type information the class's dispatch vector points to.
    pub fn type_info(self) -> &'t TypeInfo {
        self.type_info
    }

    /// The kind of instances the class describes.
    pub fn kind(self) -> TypeKind {
        self.type_info.kind()
    }

    /// The class's dispatch vector.
    pub fn dispatch_vector(self) -> RawDispatchVectorRef<'t> {
        self.raw.dispatch_vector()
    }

    /// The names of the interfaces the class implements, in declaration
    /// order.
    pub fn interfaces(self) -> Interfaces<'t> {
        self.dispatch_vector().interfaces()
    }

    /// The number of interfaces the class implements.
    pub fn interface_count(self) -> usize {
        self.raw.interface_count()
    }

    /// Whether the class implements the interface named `name`.
    pub fn implements_interface(self, name: &CStr) -> bool {
        let found = self.dispatch_vector().implements_interface(name);
        tracing::trace!(class = ?self.name(), interface = ?name, found, "interface lookup");
        found
    }
}

impl core::fmt::Debug for ClassRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClassRef")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("interfaces", &self.interfaces().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    static_assertions::assert_impl_all!(ClassTable: Send, Sync, Clone);
    static_assertions::assert_impl_all!(ClassRef<'static>: Send, Sync, Copy);

    fn interfaces_of(class: ClassRef<'_>) -> Vec<&CStr> {
        class.interfaces().collect()
    }

    #[test]
    fn test_load_links_interfaces_in_order() {
        let table = ClassTable::new();
        let dog = ClassDefinition::object("Dog")
            .implements("Animal")
            .implements("Pet");
        let id = table.load(dog).unwrap();
        let dog = table.class(id).unwrap();

        assert_eq!(dog.id(), id);
        assert_eq!(dog.name(), c"Dog");
        assert_eq!(dog.kind(), TypeKind::Object);
        assert_eq!(dog.interface_count(), 2);
        assert_eq!(interfaces_of(dog), vec![c"Animal", c"Pet"]);
        assert!(dog.implements_interface(c"Animal"));
        assert!(!dog.implements_interface(c"Vehicle"));
    }

    #[test]
    fn test_dispatch_vector_points_at_type_info() {
        let table = ClassTable::new();
        let id = table.load(ClassDefinition::object("Cat")).unwrap();
        let cat = table.class(id).unwrap();

        let type_info = cat.dispatch_vector().type_info().cast::<TypeInfo>();
        assert!(core::ptr::eq(type_info, cat.type_info()));
        assert!(cat.dispatch_vector().interface_list().is_none());
    }

    #[test]
    fn test_lookups() {
        let table = ClassTable::new();
        assert!(table.is_empty());
        let a = table.load(ClassDefinition::object("A")).unwrap();
        let b = table.load(ClassDefinition::object("B")).unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(table.len(), 2);

        let b_ref = table.class_by_name(c"B").unwrap();
        assert_eq!(b_ref.id(), b);
        let found = table
            .class_of_dispatch_vector(b_ref.dispatch_vector().as_ptr())
            .unwrap();
        assert_eq!(found.id(), b);

        assert!(table.class_by_name(c"C").is_none());
        assert_eq!(table.class_by_str("B").unwrap().id(), b);
        assert!(table.class_by_str("C").is_none());
        assert!(table.class_by_str("B\0").is_none());
        assert!(table.class(ClassId(7)).is_none());
        assert!(table.class_of_dispatch_vector(core::ptr::null()).is_none());

        let names: Vec<_> = table.iter().map(ClassRef::name).collect();
        assert_eq!(names, vec![c"A", c"B"]);
    }

    #[test]
    fn test_clones_share_classes() {
        let table = ClassTable::new();
        let other = table.clone();
        let id = other.load(ClassDefinition::object("Shared")).unwrap();
        assert_eq!(table.class(id).unwrap().name(), c"Shared");
    }

    #[test]
    fn test_distinct_interfaces_are_accepted() {
        let table = ClassTable::new();
        let id = table
            .load(
                ClassDefinition::object("Robot")
                    .implements("Runnable")
                    .implements("Closeable")
                    .implements("Comparable"),
            )
            .unwrap();
        let robot = table.class(id).unwrap();
        assert_eq!(
            interfaces_of(robot),
            vec![c"Runnable", c"Closeable", c"Comparable"]
        );
        assert!(robot.implements_interface(c"Closeable"));
    }

    #[test]
    fn test_rejections() {
        let table = ClassTable::new();
        table.load(ClassDefinition::object("Dog")).unwrap();

        let report = table.load(ClassDefinition::object("Dog")).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::DuplicateClass);

        let cat = ClassDefinition::object("Cat")
            .implements("Pet")
            .implements("Pet");
        let report = table.load(cat).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::MalformedMetadata);

        let report = table.load(ClassDefinition::object("")).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);

        let report = table
            .load(ClassDefinition::object("Bad\0Name"))
            .unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);

        let report = table
            .load(ClassDefinition::object("Cow").implements(""))
            .unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);

        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_builtins() {
        let table = ClassTable::with_builtins().unwrap();
        assert_eq!(table.len(), 10);

        let object = table.class_by_name(c"java.lang.Object").unwrap();
        assert_eq!(object.interface_count(), 0);

        let string = table.class_by_name(c"java.lang.String").unwrap();
        assert_eq!(string.kind(), TypeKind::String);
        assert!(string.implements_interface(c"java.lang.CharSequence"));

        let ints = table.class_by_name(c"[I").unwrap();
        assert_eq!(ints.kind(), TypeKind::Array(ElementType::Int));
        assert_eq!(
            interfaces_of(ints),
            vec![c"java.lang.Cloneable", c"java.io.Serializable"]
        );
    }
}
