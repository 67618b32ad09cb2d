//! End-to-end coverage: build a message with the `Builder`, accept it with
//! the `Verifier`, and read it back through the `Table`/`TableWithVTable`
//! accessors, exercising the three components together the way
//! schema-generated code would.

use flatrt::builder::Builder;
use flatrt::position::TablePosition;
use flatrt::verifier::Verifier;
use flatrt::Table;

const ATTACKER_DMG_SLOT: usize = 0;
const MOVIE_MAIN_TYPE_SLOT: usize = 0;
const MOVIE_MAIN_SLOT: usize = 1;

const ATTACKER_TAG: u8 = 1;

fn verify_attacker(v: &mut Verifier, pos: usize) -> bool {
    v.verify_table_start(pos)
        && v.verify_field(pos, 4, 4, 4, true)
        && v.verify_table_end(pos)
}

fn verify_movie(v: &mut Verifier, pos: usize) -> bool {
    if !v.verify_table_start(pos) {
        return false;
    }
    let ok = v.verify_field(pos, 4, 1, 1, false)
        && v.verify_union(
            pos,
            4,
            6,
            &|v, tag, val_pos| match tag {
                ATTACKER_TAG => verify_attacker(v, val_pos),
                0 => true,
                _ => false,
            },
            false,
        );
    v.verify_table_end(pos) && ok
}

#[test]
fn union_round_trip() {
    let mut b = Builder::new(0);

    b.start_object(1);
    b.prepend_slot::<i32>(ATTACKER_DMG_SLOT, 100, 0, 4);
    let attacker = b.end_object();

    b.start_object(2);
    b.prepend_slot::<u8>(MOVIE_MAIN_TYPE_SLOT, ATTACKER_TAG, 0, 1);
    b.prepend_slot_uoffset(MOVIE_MAIN_SLOT, attacker);
    let movie = b.end_object();

    b.finish(movie, None, false);
    let bytes = b.finished_bytes();

    let mut v = Verifier::new(bytes, 0);
    assert!(v.verify_buffer(None, false, &verify_movie));

    let root_pos = flatrt::position::follow_indirect(&bytes, 0);
    let movie_table = Table::new(bytes, TablePosition::new(root_pos)).into_with_vtable();

    assert_eq!(Some(ATTACKER_TAG), movie_table.read_field::<u8>(4));

    let attacker_table = movie_table.union_table(6).expect("attacker present");
    assert_eq!(Some(100i32), attacker_table.read_field::<i32>(4));
}

#[test]
fn empty_table_byte_layout() {
    let mut b = Builder::new(0);
    b.start_object(0);
    let table = b.end_object();
    b.finish(table, None, false);

    let bytes = b.finished_bytes();
    assert_eq!(
        bytes,
        &[0x08, 0x00, 0x00, 0x00, 0x04, 0x00, 0x04, 0x00, 0x04, 0x00, 0x00, 0x00]
    );

    let mut v = Verifier::new(bytes, 0);
    assert!(v.verify_buffer(None, false, &|v, pos| v.verify_table_start(pos) && v.verify_table_end(pos)));
}

#[test]
fn string_field_round_trips() {
    let mut b = Builder::new(0);
    let s = b.create_string("hello");
    b.start_object(1);
    b.prepend_slot_uoffset(0, s);
    let table = b.end_object();
    b.finish(table, None, false);
    let bytes = b.finished_bytes();

    let mut v = Verifier::new(bytes, 0);
    let ok = v.verify_buffer(None, false, &|v, pos| {
        v.verify_table_start(pos) && v.verify_string(pos, 4, true) && v.verify_table_end(pos)
    });
    assert!(ok);

    let root_pos = flatrt::position::follow_indirect(&bytes, 0);
    let table = Table::new(bytes, TablePosition::new(root_pos)).into_with_vtable();
    let str_pos = table.field_position(4).expect("field present");
    let s = flatrt::String::new(bytes, flatrt::position::StringPosition::new(str_pos));
    assert_eq!("hello", s.as_str());
}

#[test]
fn forward_offset_past_end_is_rejected() {
    let mut buf = vec![0u8; 16];
    buf[0] = 100; // root uoffset points 100 bytes forward, past the buffer
    let mut v = Verifier::new(&buf, 0);
    let ok = v.verify_buffer(None, false, &|v, pos| v.verify_table_start(pos) && v.verify_table_end(pos));
    assert!(!ok);
}

#[test]
fn max_depth_boundary_is_enforced() {
    // Two tables nested: outer holds a uoffset field to inner.
    let mut b = Builder::new(0);
    b.start_object(0);
    let inner = b.end_object();

    b.start_object(1);
    b.prepend_slot_uoffset(0, inner);
    let outer = b.end_object();
    b.finish(outer, None, false);
    let bytes = b.finished_bytes();

    fn verify_inner(v: &mut Verifier, pos: usize) -> bool {
        v.verify_table_start(pos) && v.verify_table_end(pos)
    }
    fn verify_outer(v: &mut Verifier, pos: usize) -> bool {
        v.verify_table_start(pos) && v.verify_table(pos, 4, &verify_inner, false) && v.verify_table_end(pos)
    }

    let mut v = Verifier::new(bytes, 0);
    v.set_max_depth(2);
    assert!(v.verify_buffer(None, false, &verify_outer));

    let mut v = Verifier::new(bytes, 0);
    v.set_max_depth(1);
    assert!(!v.verify_buffer(None, false, &verify_outer));
}
