use byteforge_asm::{assemble, assemble_program};

#[test]
fn forward_and_backward_references_agree() {
    let forward = assemble("JMP target\nPOP\ntarget: HALT").unwrap();
    let backward = assemble("JMP 4\nPOP\ntarget: HALT\nJMP target").unwrap();
    assert_eq!(&forward[0..3], &[0x30, 4, 0]);
    assert_eq!(&backward[5..8], &[0x30, 4, 0]);
}

#[test]
fn label_binds_offset_before_same_line_instruction() {
    let p = assemble_program("PUSH 1\nhere: CALL here").unwrap();
    assert_eq!(p.labels["here"], 9);
    assert_eq!(&p.code[9..], &[0x32, 9, 0]);
}

#[test]
fn several_labels_on_one_offset() {
    let p = assemble_program("a:\nb:\n  ; c is not a label\nc: RET").unwrap();
    assert_eq!(p.labels.len(), 3);
    assert!(p.labels.values().all(|&off| off == 0));
}

#[test]
fn label_wins_over_numeric_reading() {
    // a label spelled like a number is still looked up first
    let code = assemble("JMP 7\nPOP\n7: HALT").unwrap();
    assert_eq!(&code[0..3], &[0x30, 4, 0]);
}

#[test]
fn labels_may_shadow_mnemonics() {
    let code = assemble("JMP HALT\nHALT: HALT").unwrap();
    assert_eq!(code, vec![0x30, 3, 0, 0xFF]);
}

#[test]
fn label_lookup_is_case_sensitive() {
    let err = assemble("Loop: JMP loop").unwrap_err();
    assert_eq!(err.line(), 1);
}

#[test]
fn data_addresses_accept_labels_too() {
    let code = assemble("STORE slot\nslot: HALT").unwrap();
    assert_eq!(code, vec![0x21, 3, 0, 0xFF]);
}
