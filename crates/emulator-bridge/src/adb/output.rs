//! Reading adb's text output
//!
//! adb prints human-readable text with no stable format. All substring and
//! line matching on it lives here so the rest of the crate only sees
//! booleans and typed values.

use crate::device::Device;

/// `adb connect` reports success with "connected to" or "already connected to"
pub fn is_connected(output: &str) -> bool {
    output.contains("connected")
}

/// `adb pair` printed something; an empty reply means the pairing failed
pub fn pairing_succeeded(output: Option<&str>) -> bool {
    output.is_some_and(|text| !text.trim().is_empty())
}

/// `getprop sys.boot_completed` prints `1` once boot has finished
pub fn boot_completed(output: &str) -> bool {
    output.trim() == "1"
}

/// Parse `adb devices` into devices
///
/// Skips the `List of devices attached` header and daemon start-up chatter
/// (`* daemon not running; starting now at tcp:5037`).
pub fn parse_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let (udid, state) = match line.split_once('\t') {
                Some((udid, state)) => (udid.trim(), state.trim()),
                None => {
                    let mut parts = line.split_whitespace();
                    (parts.next()?, parts.next()?)
                }
            };
            (!udid.is_empty() && !state.is_empty()).then(|| Device::new(udid, state))
        })
        .collect()
}

/// First non-empty line, used for `emu avd name` replies
pub fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceState;

    #[test]
    fn test_connect_output() {
        assert!(is_connected("connected to 192.168.1.20:37001\n"));
        assert!(is_connected("already connected to 192.168.1.20:37001"));
        assert!(!is_connected("failed to connect to '192.168.1.20:37001': Connection refused"));
        assert!(!is_connected("cannot connect to 192.168.1.20:5555: No route to host (113)"));
        assert!(!is_connected(""));
    }

    #[test]
    fn test_pair_output() {
        assert!(pairing_succeeded(Some(
            "Successfully paired to 192.168.1.20:41235 [guid=adb-R58M-abc]"
        )));
        assert!(!pairing_succeeded(Some("")));
        assert!(!pairing_succeeded(Some("\n")));
        assert!(!pairing_succeeded(None));
    }

    #[test]
    fn test_parse_devices() {
        let output = "\
* daemon not running; starting now at tcp:5037
* daemon started successfully
List of devices attached
emulator-5554\tdevice
R58M12ABCDE\tunauthorized
192.168.1.20:37001\toffline
0123456789\tno permissions (user in plugdev group); see [http://developer.android.com/tools/device.html]

";
        let devices = parse_devices(output);
        assert_eq!(devices.len(), 4);
        assert_eq!(devices[0].udid, "emulator-5554");
        assert_eq!(devices[0].state, DeviceState::Online);
        assert_eq!(devices[1].state, DeviceState::Unauthorized);
        assert_eq!(devices[2].state, DeviceState::Offline);
        assert!(devices[3].state.as_str().starts_with("no permissions"));
    }

    #[test]
    fn test_parse_devices_space_separated() {
        let devices = parse_devices("List of devices attached\nemulator-5556    device\n");
        assert_eq!(devices, vec![Device::new("emulator-5556", "device")]);
    }

    #[test]
    fn test_boot_completed() {
        assert!(boot_completed("1\n"));
        assert!(!boot_completed("\n"));
        assert!(!boot_completed("0"));
    }
}
