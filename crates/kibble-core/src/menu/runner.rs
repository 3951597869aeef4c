/// Runs `menu` to completion, polling `input` every [`MENU_POLL_MS`].
///
/// The display is switched on for the session and off again on exit. A
/// display fault is logged once and otherwise ignored, so the keyboard can
/// still close the menu.
pub async fn run_session<I, M, C, D, S>(
    menu: &mut SettingsMenu,
    input: &mut I,
    display: &mut M,
    clock: &C,
    delay: &mut D,
    store: &mut S,
) -> MenuExit
where
    I: InputProvider,
    I::Error: Debug,
    M: MenuDisplay,
    M::Error: Debug,
    C: Clock,
    D: DelayNs,
    S: SettingsStore,
    S::Error: Debug,
{
    if let Err(err) = display.set_enabled(true) {
        debug!("menu: display power-on failed: {:?}", err);
    }
    delay.delay_ms(MENU_POLL_MS).await;

    let mut display_fault_logged = false;
    let exit = loop {
        let now_ms = clock.now_ms();
        match menu.tick(now_ms) {
            MenuTick::Closed(exit) => break exit,
            MenuTick::Redraw => {
                if let Err(err) = menu.with_view(now_ms, |view| display.show(view))
                    && !display_fault_logged
                {
                    debug!("menu: display write failed: {:?}", err);
                    display_fault_logged = true;
                }
            }
            MenuTick::Idle => {}
        }

        if let Some(key) = poll_key_lossy(input) {
            if let MenuStatus::Closed(exit) = menu.handle_key(key, clock.now_ms(), store) {
                break exit;
            }
            continue;
        }

        delay.delay_ms(MENU_POLL_MS).await;
    };

    if let Err(err) = display.set_enabled(false) {
        debug!("menu: display power-off failed: {:?}", err);
    }
    exit
}
