use byteforge_asm::assemble_program;
use byteforge_asm::disasm::{decode_all, fmt_decoded};
use pretty_assertions::assert_eq;

const LOOP: &str = "
    PUSH 10
    STORE 0x08
top:
    LOAD 0x08
    DUP
    PRINT
    PUSH 1
    SUB
    DUP
    STORE 0x08
    JZ done
    JMP top
done:
    CALL report
    HALT
report: DUMP_STACK
    RET
";

#[test]
fn decoded_offsets_match_pass_one() {
    let p = assemble_program(LOOP).unwrap();
    let decoded = decode_all(&p.code).unwrap();
    let offsets: Vec<usize> = decoded.iter().map(|d| d.offset).collect();
    assert_eq!(offsets, p.offsets);
    assert_eq!(decoded.last().unwrap().next(), p.code.len());
}

#[test]
fn listing_reassembles_to_same_bytes() {
    let p = assemble_program(LOOP).unwrap();
    let listing: Vec<String> = decode_all(&p.code).unwrap().iter().map(fmt_decoded).collect();
    let again = assemble_program(&listing.join("\n")).unwrap();
    assert_eq!(again.code, p.code);
}

#[test]
fn jump_operands_decode_to_label_offsets() {
    let p = assemble_program(LOOP).unwrap();
    let decoded = decode_all(&p.code).unwrap();
    let jz = decoded.iter().find(|d| d.mnemonic == "JZ").unwrap();
    assert_eq!(jz.operand, Some(p.labels["done"] as u64));
    let call = decoded.iter().find(|d| d.mnemonic == "CALL").unwrap();
    assert_eq!(call.operand, Some(p.labels["report"] as u64));
}
