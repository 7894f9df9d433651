/// Vulkan Debug Messenger - routes validation layer messages into the engine logger
///
/// Messages are filtered by `DebugSeverity`, counted in `ValidationStats`, and
/// repeated messages are tagged with their occurrence count.

use ash::vk;
use colored::*;
use nova_renderer::nova::{DebugSeverity, ValidationStats};
use nova_renderer::{engine_debug, engine_error, engine_trace, engine_warn};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Active severity filter (None = messenger shut down, drop everything)
static DEBUG_SEVERITY: Mutex<Option<DebugSeverity>> = Mutex::new(None);

/// Global validation statistics (thread-safe atomic counters)
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrences per distinct message text
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Thread-safe validation statistics tracker
struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Enable message routing with the given filter (resets statistics)
pub fn init_debug_config(severity: DebugSeverity) {
    VALIDATION_STATS.reset();
    if let Ok(mut tracker) = MESSAGE_TRACKER.lock() {
        *tracker = Some(FxHashMap::default());
    }
    if let Ok(mut config) = DEBUG_SEVERITY.lock() {
        *config = Some(severity);
    }
}

/// Stop routing messages (called before the messenger is destroyed)
pub fn cleanup_debug_config() {
    if let Ok(mut config) = DEBUG_SEVERITY.lock() {
        *config = None;
    }
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print validation statistics report
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(tracker) = MESSAGE_TRACKER.lock() {
        if let Some(messages) = tracker.as_ref() {
            let repeated = messages.values().filter(|&&count| count > 1).count();
            if repeated > 0 {
                println!("\n  {} message(s) appeared multiple times", repeated);
            }
        }
    }
    println!("{}\n", "====================================".bright_blue().bold());
}

/// Vulkan severity flags requested from the messenger for a filter
pub fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Messenger create info used both for the messenger and for instance creation
pub fn messenger_create_info(severity: DebugSeverity) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severity_flags(severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Count one occurrence of `message`, returning its total so far
fn track_message(message: &str) -> u32 {
    match MESSAGE_TRACKER.lock() {
        Ok(mut tracker) => {
            let messages = tracker.get_or_insert_with(FxHashMap::default);
            let count = messages.entry(message.to_string()).or_insert(0);
            *count += 1;
            *count
        }
        Err(_) => 1,
    }
}

/// Route one validation message to the engine logger
///
/// Returns false when the message is filtered out.
pub(crate) fn route_message(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    message_id_name: &str,
    message: &str,
) -> bool {
    let severity = match DEBUG_SEVERITY.lock() {
        Ok(config) => match *config {
            Some(severity) => severity,
            None => return false,
        },
        Err(_) => return false,
    };

    let is_error = message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);
    let is_warning = message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING);
    let displayed = match severity {
        DebugSeverity::ErrorsOnly => is_error,
        DebugSeverity::ErrorsAndWarnings => is_error || is_warning,
        DebugSeverity::All => true,
    };
    if !displayed {
        return false;
    }

    let occurrences = track_message(message);
    let repeat = if occurrences > 1 { format!(" [x{}]", occurrences) } else { String::new() };
    let type_name = message_type_name(message_type);

    if is_error {
        VALIDATION_STATS.errors.fetch_add(1, Ordering::Relaxed);
        engine_error!("nova::vulkan::validation", "[{}]{} {}: {}", type_name, repeat, message_id_name, message);
    } else if is_warning {
        VALIDATION_STATS.warnings.fetch_add(1, Ordering::Relaxed);
        engine_warn!("nova::vulkan::validation", "[{}]{} {}: {}", type_name, repeat, message_id_name, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        VALIDATION_STATS.info.fetch_add(1, Ordering::Relaxed);
        engine_debug!("nova::vulkan::validation", "[{}]{} {}: {}", type_name, repeat, message_id_name, message);
    } else {
        VALIDATION_STATS.verbose.fetch_add(1, Ordering::Relaxed);
        engine_trace!("nova::vulkan::validation", "[{}]{} {}: {}", type_name, repeat, message_id_name, message);
    }
    true
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers when they detect issues.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    route_message(message_severity, message_type, message_id_name, message);

    vk::FALSE // Don't abort Vulkan execution
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
