//! Privilege detection for ICMP sockets
//!
//! Sending echo requests needs either a raw socket (root or `CAP_NET_RAW`)
//! or, on Linux, an unprivileged ICMP datagram socket allowed by
//! `net.ipv4.ping_group_range`. Whether the socket actually opens is the only
//! reliable answer; the checks here are for diagnostics.

/// Whether the process runs with an effective uid of 0
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Platform-specific instructions for granting ICMP access
pub fn elevation_instructions() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "To send ICMP echo requests on Linux, either:\n\
         \n\
         Option 1 - Run the daemon as root:\n\
         $ sudo geopingd\n\
         \n\
         Option 2 - Grant CAP_NET_RAW to the binary:\n\
         $ sudo setcap cap_net_raw+ep /usr/local/bin/geopingd\n\
         \n\
         Option 3 - Allow unprivileged ICMP sockets for your group:\n\
         $ sudo sysctl -w net.ipv4.ping_group_range=\"0 2147483647\""
    }

    #[cfg(target_os = "macos")]
    {
        "To send ICMP echo requests on macOS, run the daemon as root:\n\
         $ sudo geopingd"
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        "Run the daemon with administrator privileges to send ICMP echo requests."
    }
}
