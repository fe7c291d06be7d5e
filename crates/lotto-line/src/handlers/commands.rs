use tracing::{info, warn};

use lotto_core::{
    domain::EventContext,
    messaging::{dispatch::BroadcastReport, types::OutboundMessage},
    utils::unix_timestamp,
};

use crate::router::{AppState, ImageRefresh};

const CMD_RESULT: &str = "/ผลหวย";
const CMD_REFRESH: &str = "/รีเฟรชผลหวย";
const CMD_ANNOUNCE: &str = "/ประกาศผลหวย";
const CMD_CLOSED: &str = "/ปิดรับ";
const CMD_TRANSFER: &str = "/แจ้งโอน";
const CMD_SEND_IMAGE: &str = "/ส่งผลหวย";
const CMD_REMEMBER: &str = "/จำกลุ่ม";
const CMD_STATUS: &str = "/สถานะ";
const CMD_MENU: &str = "/เมนู";
const CMD_COMMANDS: &str = "/คำสั่ง";

const MSG_BASE_URL: &str = "⚠️ Server Config Error: BASE_URL is missing or not HTTPS.";
const MSG_NO_RESULT: &str = "⏳ ยังดึงผลหวยไม่ได้ครับ";
const MSG_RENDER_FAILED: &str = "⚠️ สร้างรูปผลหวยไม่สำเร็จ ลองใหม่อีกครั้งครับ";
const MSG_SEND_USAGE: &str = "⚠️ วิธีใช้: /ส่งผลหวย https://ลิ้งก์รูป.jpg";
const MSG_SEND_HTTPS: &str = "⚠️ ลิงก์ต้องเป็น https เท่านั้น";
const MSG_SEND_DONE: &str = "✅ กำลัง Broadcast รูปไปยังทุกกลุ่ม...";

const MENU: &str = "รายการคำสั่ง:\n\
/ผลหวย : ดูรูปผลหวย (ส่งให้ผู้สั่งเท่านั้น)\n\
/รีเฟรชผลหวย : ดึงผลหวยใหม่แล้วส่งรูป\n\
/ประกาศผลหวย : ส่งรูปผลหวยหาทุกกลุ่ม\n\
/ปิดรับ : ส่งรูปปิดรับหาทุกกลุ่ม\n\
/แจ้งโอน : ส่งรูปแจ้งโอนหาทุกกลุ่ม\n\
/ส่งผลหวย [ลิ้งก์] : ส่งรูปลิ้งก์นั้นหาทุกกลุ่ม\n\
/จำกลุ่ม : เปิด/ปิดการจำกลุ่ม\n\
/สถานะ : ดูสถานะการจำกลุ่ม";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Result image to the requester.
    Result,
    /// Same as `Result`, bypassing the cache.
    Refresh,
    /// Result image to the requester and every remembered group.
    Announce,
    Closed,
    Transfer,
    /// Arbitrary image URL to the requester and every remembered group.
    SendImage(Option<String>),
    ToggleRemember,
    Status,
    Menu,
}

impl Command {
    /// Match trimmed message text against the command table.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let cmd = match text {
            CMD_RESULT => Self::Result,
            CMD_REFRESH => Self::Refresh,
            CMD_ANNOUNCE => Self::Announce,
            CMD_CLOSED => Self::Closed,
            CMD_TRANSFER => Self::Transfer,
            CMD_REMEMBER => Self::ToggleRemember,
            CMD_STATUS => Self::Status,
            CMD_MENU | CMD_COMMANDS => Self::Menu,
            _ => {
                let mut parts = text.split_whitespace();
                if parts.next() != Some(CMD_SEND_IMAGE) {
                    return None;
                }
                Self::SendImage(parts.next().map(str::to_string))
            }
        };
        Some(cmd)
    }
}

pub(super) async fn run(state: &AppState, ctx: &EventContext, cmd: Command) {
    match cmd {
        Command::Result => {
            send_result_image(state, ctx, false).await;
        }
        Command::Refresh => {
            send_result_image(state, ctx, true).await;
        }
        Command::Announce => {
            if let Some(msg) = send_result_image(state, ctx, false).await {
                broadcast(state, ctx, msg).await;
            }
        }
        Command::Closed => {
            let url = state.cfg.close_image_url.clone();
            send_and_broadcast(state, ctx, OutboundMessage::image(url)).await;
        }
        Command::Transfer => {
            let url = state.cfg.transfer_image_url.clone();
            send_and_broadcast(state, ctx, OutboundMessage::image(url)).await;
        }
        Command::SendImage(None) => reply_text(state, ctx, MSG_SEND_USAGE).await,
        Command::SendImage(Some(url)) => {
            if !is_https(&url) {
                reply_text(state, ctx, MSG_SEND_HTTPS).await;
                return;
            }
            send_and_broadcast(state, ctx, OutboundMessage::image(url)).await;
            reply_text(state, ctx, MSG_SEND_DONE).await;
        }
        Command::ToggleRemember => {
            let enabled = state.registry().toggle().await;
            info!(enabled, "remember groups toggled");
            let text = if enabled {
                "✅ เปิดการจำกลุ่มแล้ว"
            } else {
                "⛔ ปิดการจำกลุ่มแล้ว"
            };
            reply_text(state, ctx, text).await;
        }
        Command::Status => {
            let registry = state.registry();
            let text = format!(
                "สถานะการจำกลุ่ม: {}\nจำนวนกลุ่มที่จำไว้: {}",
                if registry.is_enabled().await { "เปิด" } else { "ปิด" },
                registry.len().await
            );
            reply_text(state, ctx, &text).await;
        }
        Command::Menu => reply_text(state, ctx, MENU).await,
    }
}

fn is_https(url: &str) -> bool {
    url.to_lowercase().starts_with("https://")
}

async fn reply_text(state: &AppState, ctx: &EventContext, text: &str) {
    state
        .dispatcher
        .safe_send(ctx, &[OutboundMessage::text(text)])
        .await;
}

/// Fetch, render and send the result image to the requester.
///
/// Returns the image message when one was sent, so callers can broadcast it.
async fn send_result_image(
    state: &AppState,
    ctx: &EventContext,
    force: bool,
) -> Option<OutboundMessage> {
    if !state.cfg.has_https_base_url() {
        reply_text(state, ctx, MSG_BASE_URL).await;
        return None;
    }

    match state.refresh_image(force).await {
        ImageRefresh::Ready => {
            let msg = OutboundMessage::image(state.image_url(unix_timestamp()));
            state
                .dispatcher
                .safe_send(ctx, std::slice::from_ref(&msg))
                .await;
            Some(msg)
        }
        ImageRefresh::NoResult => {
            reply_text(state, ctx, MSG_NO_RESULT).await;
            None
        }
        ImageRefresh::RenderFailed(_) => {
            reply_text(state, ctx, MSG_RENDER_FAILED).await;
            None
        }
    }
}

async fn send_and_broadcast(state: &AppState, ctx: &EventContext, msg: OutboundMessage) {
    state
        .dispatcher
        .safe_send(ctx, std::slice::from_ref(&msg))
        .await;
    broadcast(state, ctx, msg).await;
}

/// Multicast to every remembered group except the one the command came from.
async fn broadcast(state: &AppState, ctx: &EventContext, msg: OutboundMessage) -> BroadcastReport {
    let report = state.dispatcher.push_to_all(&[msg], ctx.group_id()).await;
    if report.failed_chunks > 0 {
        warn!(
            recipients = report.recipients,
            failed_chunks = report.failed_chunks,
            "broadcast partially failed"
        );
    } else {
        info!(recipients = report.recipients, chunks = report.chunks, "broadcast done");
    }
    report
}
