#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod reader;
mod writer;

// -----------------------------------------------------------------------------
// Exports

pub use reader::BinaryReader;
pub use writer::BinaryWriter;

use alloc::vec::Vec;

use vc_archive::{
    ArchiveError, ArchiveFlags, Archived, ClassResolver, InputSession, OutputSession,
};

/// Save `value` into a new buffer, with header.
pub fn to_vec<T: Archived>(
    value: &T,
    resolver: &dyn ClassResolver,
) -> Result<Vec<u8>, ArchiveError> {
    let mut output = OutputSession::new(BinaryWriter::new(), resolver, ArchiveFlags::empty())?;
    output.save(value)?;
    Ok(output.into_writer().into_inner())
}

/// Load a `T` from a buffer written by [`to_vec`].
///
/// Objects created through pointers inside the value belong to the caller.
///
/// On failure those objects have already been destroyed by the session, so
/// the partially loaded value is leaked instead of dropped. Whatever else it
/// allocated is leaked with it.
pub fn from_slice<T: Archived>(
    data: &[u8],
    resolver: &dyn ClassResolver,
) -> Result<T, ArchiveError> {
    let mut input = InputSession::new(BinaryReader::new(data), resolver, ArchiveFlags::empty())?;
    let mut value = T::construct();
    match input.load_into(&mut value) {
        Ok(()) => Ok(value),
        Err(err) => {
            core::mem::forget(value);
            Err(err)
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
#[expect(unsafe_code, reason = "test graphs are linked through raw pointers")]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use core::cell::Cell;
    use core::ptr::NonNull;

    use vc_archive::{
        ArchiveError, ArchiveFlags, Archived, ClassInfo, DynPtr, InputArchive, InputSession,
        OutputArchive, OutputSession, StreamError, TypeRegistry,
    };

    use super::{BinaryReader, BinaryWriter, from_slice, to_vec};

    std::thread_local! {
        static LIVE: Cell<isize> = const { Cell::new(0) };
    }

    fn live() -> isize {
        LIVE.get()
    }

    /// Graph vertex with outgoing edges.
    struct Vertex {
        label: String,
        edges: Vec<NonNull<Vertex>>,
    }

    impl Vertex {
        fn new(label: &str) -> NonNull<Vertex> {
            let mut vertex = Vertex::construct();
            vertex.label = label.to_string();
            NonNull::from(Box::leak(Box::new(vertex)))
        }
    }

    impl Drop for Vertex {
        fn drop(&mut self) {
            LIVE.set(LIVE.get() - 1);
        }
    }

    impl Archived for Vertex {
        const VERSION: u32 = 1;

        fn construct() -> Self {
            LIVE.set(LIVE.get() + 1);
            Vertex {
                label: String::new(),
                edges: Vec::new(),
            }
        }

        fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
            ar.load(&mut self.label)?;
            let count = ar.reader().read_len()?;
            for _ in 0..count {
                match ar.load_ptr::<Vertex>()? {
                    Some(edge) => self.edges.push(edge),
                    None => return Err(ArchiveError::custom("null edge")),
                }
            }
            Ok(())
        }

        fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
            ar.save(&self.label)?;
            ar.writer().write_len(self.edges.len())?;
            for edge in &self.edges {
                // SAFETY: graphs in these tests only link live vertices.
                unsafe { ar.save_ptr(Some(*edge))? };
            }
            Ok(())
        }
    }

    /// Free every vertex reachable from `root`.
    unsafe fn free_graph(root: NonNull<Vertex>) {
        let mut seen = Vec::new();
        let mut stack = alloc::vec![root];
        while let Some(vertex) = stack.pop() {
            if seen.contains(&vertex) {
                continue;
            }
            seen.push(vertex);
            // SAFETY: every vertex is live until the loop below.
            stack.extend(unsafe { vertex.as_ref() }.edges.iter().copied());
        }
        for vertex in seen {
            // SAFETY: allocated through `Box` and visited once.
            drop(unsafe { Box::from_raw(vertex.as_ptr()) });
        }
    }

    /// a -> b, a -> c, b -> c, c -> a, c -> c
    fn sample_graph() -> NonNull<Vertex> {
        let a = Vertex::new("a");
        let b = Vertex::new("b");
        let c = Vertex::new("c");
        // SAFETY: freshly allocated and not shared yet.
        unsafe {
            (*a.as_ptr()).edges.extend([b, c]);
            (*b.as_ptr()).edges.push(c);
            (*c.as_ptr()).edges.extend([a, c]);
        }
        a
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register::<Vertex>();
        registry.register::<Dog>();
        registry.register::<Cat>();
        registry
    }

    fn write_graph(registry: &TypeRegistry, root: NonNull<Vertex>) -> Vec<u8> {
        let mut output =
            OutputSession::new(BinaryWriter::new(), registry, ArchiveFlags::empty()).unwrap();
        // SAFETY: the graph is live for the call.
        unsafe { output.save_pointer(Some(root)).unwrap() };
        output.into_writer().into_inner()
    }

    #[test]
    fn cyclic_graph_round_trips() {
        let registry = registry();
        let root = sample_graph();
        let bytes = write_graph(&registry, root);

        let reader = BinaryReader::new(&bytes);
        let mut input = InputSession::new(reader, &registry, ArchiveFlags::empty()).unwrap();
        let loaded = input.load_pointer::<Vertex>().unwrap().unwrap();
        assert_eq!(input.object_count(), 3);
        assert!(input.into_reader().is_empty());

        // SAFETY: the loaded graph is owned by this test.
        unsafe {
            let a = loaded.as_ref();
            let [b, c] = [a.edges[0], a.edges[1]];
            assert_eq!(a.label, "a");
            assert_eq!(b.as_ref().label, "b");
            assert_eq!(b.as_ref().edges, [c]);
            assert_eq!(c.as_ref().edges, [loaded, c]);

            free_graph(loaded);
            free_graph(root);
        }
        assert_eq!(live(), 0);
    }

    #[test]
    fn truncated_streams_leak_nothing() {
        let registry = registry();
        let root = sample_graph();
        let bytes = write_graph(&registry, root);
        let before = live();

        for len in 0..bytes.len() {
            let reader = BinaryReader::new(&bytes[..len]);
            let result = InputSession::new(reader, &registry, ArchiveFlags::empty())
                .and_then(|mut input| {
                    let loaded = input.load_pointer::<Vertex>();
                    assert!(loaded.is_err() == input.is_poisoned());
                    loaded
                });
            assert!(result.is_err(), "a stream cut at {len} bytes loaded");
            assert_eq!(live(), before, "objects leaked at {len} bytes");
        }

        // SAFETY: owned by this test.
        unsafe { free_graph(root) };
    }

    #[test]
    fn header_must_match() {
        let registry = registry();
        let mut output =
            OutputSession::new(BinaryWriter::new(), &registry, ArchiveFlags::NO_HEADER).unwrap();
        output.save(&7_u32).unwrap();
        let bytes = output.into_writer().into_inner();

        let reader = BinaryReader::new(&bytes);
        let err = InputSession::new(reader, &registry, ArchiveFlags::empty()).unwrap_err();
        assert_eq!(err, ArchiveError::InvalidSignature);

        let reader = BinaryReader::new(&bytes);
        let mut input = InputSession::new(reader, &registry, ArchiveFlags::NO_HEADER).unwrap();
        let mut value = 0_u32;
        input.load_into(&mut value).unwrap();
        assert_eq!(value, 7);
    }

    // -------------------------------------------------------------------------
    // Polymorphism

    #[derive(Debug, PartialEq)]
    struct Dog {
        name: String,
    }

    std::thread_local! {
        static DOGS_DROPPED: Cell<usize> = const { Cell::new(0) };
    }

    impl Drop for Dog {
        fn drop(&mut self) {
            DOGS_DROPPED.set(DOGS_DROPPED.get() + 1);
        }
    }

    impl Archived for Dog {
        const POLYMORPHIC: bool = true;
        const EXPORT_NAME: Option<&'static str> = Some("zoo::Dog");

        fn construct() -> Self {
            Dog { name: String::new() }
        }

        fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
            ar.load(&mut self.name)
        }

        fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
            ar.save(&self.name)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Cat {
        lives: u8,
    }

    impl Archived for Cat {
        const POLYMORPHIC: bool = true;
        const EXPORT_NAME: Option<&'static str> = Some("zoo::Cat");
        const VERSION: u32 = 3;

        fn construct() -> Self {
            Cat { lives: 0 }
        }

        fn load(&mut self, ar: &mut dyn InputArchive, version: u32) -> Result<(), ArchiveError> {
            if version >= 2 {
                ar.load(&mut self.lives)?;
            } else {
                self.lives = 9;
            }
            Ok(())
        }

        fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
            ar.save(&self.lives)
        }
    }

    /// Animals behind an abstract base.
    #[derive(Default)]
    struct Zoo {
        animals: Vec<DynPtr>,
    }

    impl Archived for Zoo {
        fn construct() -> Self {
            Zoo::default()
        }

        fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
            let count = ar.reader().read_len()?;
            for _ in 0..count {
                if let Some(animal) = ar.load_dyn_ptr(None)? {
                    self.animals.push(animal);
                }
            }
            Ok(())
        }

        fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
            ar.writer().write_len(self.animals.len())?;
            for animal in &self.animals {
                // SAFETY: the zoo owns live animals.
                unsafe { ar.save_dyn_ptr(Some(*animal), None)? };
            }
            Ok(())
        }
    }

    impl Drop for Zoo {
        fn drop(&mut self) {
            for animal in self.animals.drain(..) {
                // SAFETY: every animal is boxed and owned by this zoo only.
                unsafe { animal.destroy() };
            }
        }
    }

    fn boxed<T: Archived>(value: T) -> DynPtr {
        // SAFETY: the box is leaked, the pointer stays valid until destroyed.
        unsafe { DynPtr::of(NonNull::from(Box::leak(Box::new(value)))) }
    }

    #[test]
    fn polymorphic_pointers_round_trip() {
        let registry = registry();
        let zoo = Zoo {
            animals: alloc::vec![
                boxed(Dog { name: "rex".to_string() }),
                boxed(Cat { lives: 7 }),
                boxed(Dog { name: "fido".to_string() }),
            ],
        };

        let bytes = to_vec(&zoo, &registry).unwrap();
        let loaded: Zoo = from_slice(&bytes, &registry).unwrap();

        assert_eq!(loaded.animals.len(), 3);
        // SAFETY: all animals are live and owned by `loaded`.
        unsafe {
            assert_eq!(
                loaded.animals[0].downcast::<Dog>().unwrap().as_ref(),
                &Dog { name: "rex".to_string() }
            );
            assert_eq!(loaded.animals[1].downcast::<Cat>().unwrap().as_ref(), &Cat { lives: 7 });
            assert!(loaded.animals[2].is::<Dog>());
        }
        // The class names are written once each.
        let names = bytes.windows(8).filter(|w| **w == b"zoo::Dog"[..]).count();
        assert_eq!(names, 1);
    }

    #[test]
    fn unknown_export_name_is_reported() {
        let registry = registry();
        let zoo = Zoo {
            animals: alloc::vec![boxed(Cat { lives: 1 })],
        };
        let bytes = to_vec(&zoo, &registry).unwrap();

        let mut partial = TypeRegistry::new();
        partial.register::<Dog>();
        let err = from_slice::<Zoo>(&bytes, &partial).err().unwrap();
        assert_eq!(err, ArchiveError::UnregisteredClass("zoo::Cat".to_string()));
    }

    #[test]
    fn failed_load_destroys_each_pointee_once() {
        let registry = registry();
        let zoo = Zoo {
            animals: alloc::vec![boxed(Dog { name: "rex".to_string() }), boxed(Cat { lives: 2 })],
        };
        let bytes = to_vec(&zoo, &registry).unwrap();

        let mut partial = TypeRegistry::new();
        partial.register::<Dog>();
        let err = from_slice::<Zoo>(&bytes, &partial).err().unwrap();
        assert_eq!(err, ArchiveError::UnregisteredClass("zoo::Cat".to_string()));
        // Only the loaded dog, destroyed by the rollback.
        assert_eq!(DOGS_DROPPED.get(), 1);

        drop(zoo);
        assert_eq!(DOGS_DROPPED.get(), 2);
    }

    #[test]
    fn claimed_length_is_bounded_by_input() {
        let registry = TypeRegistry::new();
        let mut bytes = to_vec(&alloc::vec![0_u64], &registry).unwrap();
        // Header: signature length, signature, library version.
        let at = 8 + "vc_archive".len() + 2;
        bytes[at..at + 8].copy_from_slice(&(1_u64 << 60).to_le_bytes());

        let err = from_slice::<Vec<u64>>(&bytes, &registry).unwrap_err();
        assert!(matches!(err, ArchiveError::Malformed(StreamError::UnexpectedEof { .. })));
    }

    #[test]
    fn class_info_is_available() {
        let info = ClassInfo::of::<Cat>();
        assert_eq!(info.export_name(), Some("zoo::Cat"));
        assert_eq!(info.version(), 3);
    }
}
