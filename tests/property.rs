//! Property-based coverage: building then reading an arbitrary scalar/string
//! round-trips byte-identically, a freshly built message always verifies, and
//! the Verifier never panics on arbitrary or single-byte-corrupted bytes.

use flatrt::builder::Builder;
use flatrt::position::TablePosition;
use flatrt::verifier::Verifier;
use flatrt::Table;
use proptest::prelude::*;

fn verify_i32_table(v: &mut Verifier, pos: usize) -> bool {
    v.verify_table_start(pos) && v.verify_field(pos, 4, 4, 4, false) && v.verify_table_end(pos)
}

fn verify_str_table(v: &mut Verifier, pos: usize) -> bool {
    v.verify_table_start(pos) && v.verify_string(pos, 4, false) && v.verify_table_end(pos)
}

proptest! {
    /// A table holding one non-default i32 field round-trips byte-identically
    /// and always verifies.
    #[test]
    fn i32_field_round_trips(value in any::<i32>().prop_filter("non-default", |v| *v != 0)) {
        let mut b = Builder::new(0);
        b.start_object(1);
        b.prepend_slot::<i32>(0, value, 0, 4);
        let table = b.end_object();
        b.finish(table, None, false);
        let bytes = b.finished_bytes();

        let mut v = Verifier::new(bytes, 0);
        prop_assert!(v.verify_buffer(None, false, &verify_i32_table));

        let root_pos = flatrt::position::follow_indirect(&bytes, 0);
        let table = Table::new(bytes, TablePosition::new(root_pos)).into_with_vtable();
        prop_assert_eq!(Some(value), table.read_field::<i32>(4));
    }

    /// A default-valued field is elided from the wire and always verifies as
    /// absent.
    #[test]
    fn i32_field_elided_when_default(_unit in any::<()>()) {
        let mut b = Builder::new(0);
        b.start_object(1);
        b.prepend_slot::<i32>(0, 0, 0, 4);
        let table = b.end_object();
        b.finish(table, None, false);
        let bytes = b.finished_bytes();
        prop_assert_eq!(12, bytes.len());

        let mut v = Verifier::new(bytes, 0);
        prop_assert!(v.verify_buffer(None, false, &verify_i32_table));
    }

    /// An arbitrary string round-trips and its terminator sits at
    /// `start + length`.
    #[test]
    fn string_field_round_trips(s in "[ -~]{0,64}") {
        let mut b = Builder::new(0);
        let str_off = b.create_string(&s);
        b.start_object(1);
        b.prepend_slot_uoffset(0, str_off);
        let table = b.end_object();
        b.finish(table, None, false);
        let bytes = b.finished_bytes();

        let mut v = Verifier::new(bytes, 0);
        prop_assert!(v.verify_buffer(None, false, &verify_str_table));

        let root_pos = flatrt::position::follow_indirect(&bytes, 0);
        let table = Table::new(bytes, TablePosition::new(root_pos)).into_with_vtable();
        let str_pos = table.field_position(4).unwrap();
        let read_back = flatrt::String::new(bytes, flatrt::position::StringPosition::new(str_pos));
        prop_assert_eq!(s.as_str(), read_back.as_str());
    }

    /// The Verifier never panics on arbitrary bytes, valid or not.
    #[test]
    fn verifier_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut v = Verifier::new(&bytes, 0);
        let _ = v.verify_buffer(None, false, &verify_i32_table);
    }

    /// Flipping a single byte of a valid message either preserves acceptance
    /// (the byte was padding) or causes rejection — it never panics and never
    /// reads out of bounds.
    #[test]
    fn single_byte_corruption_never_panics(value in any::<i32>().prop_filter("non-default", |v| *v != 0), idx in any::<usize>()) {
        let mut b = Builder::new(0);
        b.start_object(1);
        b.prepend_slot::<i32>(0, value, 0, 4);
        let table = b.end_object();
        b.finish(table, None, false);
        let bytes = b.finished_bytes().to_vec();

        let mut corrupted = bytes.clone();
        let i = idx % corrupted.len();
        corrupted[i] ^= 0xFF;

        let mut v = Verifier::new(&corrupted, 0);
        let _ = v.verify_buffer(None, false, &verify_i32_table);
    }
}
