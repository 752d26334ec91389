//! Data watchpoints, masked watchpoints and trap attribution.


use hwslots::{
    target::{HardwareBreakpointType, HostOp, WatchKind},
    SlotError, SlotResult,
};
use nix::unistd::Pid;

const PID: i32 = 777;

#[test]
fn breakpoint_then_watchpoint_scenario() -> SlotResult<()> {
    let (mut hw, _, ctl) = test_utils::manager(PID);
    let pid = Pid::from_raw(PID);

    hw.insert_breakpoint(0xDEAD_0000)?;
    assert_eq!(hw.installed(pid), 1);

    hw.insert_watchpoint(0xDEAD_0004, 4, WatchKind::Write)?;
    assert_eq!(hw.installed(pid), 2);

    hw.remove_breakpoint(0xDEAD_0000)?;
    assert_eq!(hw.installed(pid), 1);

    ctl.trap_at(0xDEAD_0004);
    assert_eq!(hw.stopped_data_address()?, Some(0xDEAD_0004));
    assert!(hw.stopped_by_watchpoint());

    ctl.trap_at(0xDEAD_0000);
    assert_eq!(hw.stopped_data_address()?, None);
    assert!(!hw.stopped_by_watchpoint());
    Ok(())
}

#[test]
fn read_watchpoint_does_not_resolve() -> SlotResult<()> {
    let (mut hw, _, ctl) = test_utils::manager(PID);

    hw.insert_watchpoint(0x4000, 4, WatchKind::Read)?;
    ctl.trap_at(0x4000);

    assert_eq!(hw.stopped_data_address()?, None);
    Ok(())
}

#[test]
fn no_trap_means_no_watchpoint() -> SlotResult<()> {
    let (mut hw, _, _) = test_utils::manager(PID);

    hw.insert_watchpoint(0x4000, 4, WatchKind::Write)?;

    assert_eq!(hw.stopped_data_address()?, None);
    Ok(())
}

#[test]
fn resolving_without_registry_creates_none() -> SlotResult<()> {
    let (hw, _, ctl) = test_utils::manager(PID);
    ctl.trap_at(0x4000);

    assert_eq!(hw.stopped_data_address()?, None);
    assert!(!hw.table().contains(Pid::from_raw(PID)));
    Ok(())
}

#[test]
fn watch_kinds_map_to_slot_types() -> SlotResult<()> {
    let (mut hw, regs, _) = test_utils::manager(PID);

    hw.insert_watchpoint(0x1000, 4, WatchKind::Write)?;
    hw.insert_watchpoint(0x1000, 4, WatchKind::Read)?;
    hw.insert_watchpoint(0x1000, 4, WatchKind::Access)?;

    let types: Vec<_> = regs.requests.borrow().iter().map(|r| r.typ).collect();
    assert_eq!(
        types,
        vec![
            HardwareBreakpointType::Write,
            HardwareBreakpointType::Read,
            HardwareBreakpointType::Access
        ]
    );
    assert_eq!(hw.installed(Pid::from_raw(PID)), 3);
    Ok(())
}

#[test]
fn unaligned_region_is_refused() {
    let (mut hw, regs, _) = test_utils::manager(PID);

    assert!(!hw.region_ok_for_watchpoint(0x1002, 4));
    assert!(hw.region_ok_for_watchpoint(0x1002, 2));
    assert!(matches!(
        hw.insert_watchpoint(0x1002, 4, WatchKind::Write),
        Err(SlotError::UnalignedRegion { .. })
    ));
    assert!(matches!(
        hw.insert_watchpoint(0x1000, 3, WatchKind::Write),
        Err(SlotError::UnsupportedWatchSize(3))
    ));
    assert_eq!(regs.installs(), 0);
}

#[test]
fn sub_word_watchpoint_watches_the_word() -> SlotResult<()> {
    let (mut hw, _, _) = test_utils::manager(PID);

    hw.insert_watchpoint(0x1003, 1, WatchKind::Write)?;
    hw.remove_watchpoint(0x1001, 1, WatchKind::Write)?;

    assert_eq!(hw.installed(Pid::from_raw(PID)), 0);
    Ok(())
}

#[test]
fn masked_watchpoint_programs_mask() -> SlotResult<()> {
    let (mut hw, regs, _) = test_utils::manager(PID);

    hw.insert_masked_watchpoint(0x8000, 0xffff_ff00, WatchKind::Access)?;

    let requests = regs.requests.borrow();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].op, HostOp::Install);
    assert_eq!(requests[1].op, HostOp::SetMask { index: 0 });
    assert_eq!(requests[1].value, 0xffff_ff00);

    let slots = hw.slots(Pid::from_raw(PID));
    assert_eq!(slots[0].mask, Some(0xffff_ff00));
    Ok(())
}

#[test]
fn masked_watchpoint_degrades_when_mask_refused() -> SlotResult<()> {
    let (mut hw, regs, _) = test_utils::manager(PID);
    regs.refuse_mask.set(true);

    hw.insert_masked_watchpoint(0x8000, 0xffff_ff00, WatchKind::Write)?;

    let slots = hw.slots(Pid::from_raw(PID));
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].mask, None);
    Ok(())
}

#[test]
fn masked_watchpoint_shares_capacity_and_duplicates() -> SlotResult<()> {
    let (mut hw, regs, _) = test_utils::manager(PID);

    hw.insert_watchpoint(0x8000, 4, WatchKind::Write)?;
    hw.insert_masked_watchpoint(0x8000, 0xff00, WatchKind::Write)?;
    assert_eq!(regs.installs(), 1);

    hw.insert_masked_watchpoint(0x9000, 0xff00, WatchKind::Write)?;
    hw.insert_masked_watchpoint(0xa000, 0xff00, WatchKind::Write)?;
    hw.insert_masked_watchpoint(0xb000, 0xff00, WatchKind::Write)?;
    assert!(matches!(
        hw.insert_masked_watchpoint(0xc000, 0xff00, WatchKind::Write),
        Err(SlotError::CapacityExceeded { .. })
    ));
    Ok(())
}

#[test]
fn masked_removal_ignores_mask() -> SlotResult<()> {
    let (mut hw, _, _) = test_utils::manager(PID);

    hw.insert_masked_watchpoint(0x8000, 0xff00, WatchKind::Read)?;
    hw.remove_masked_watchpoint(0x8000, 0x00ff, WatchKind::Read)?;

    assert_eq!(hw.installed(Pid::from_raw(PID)), 0);
    Ok(())
}
