use axum::response::Html;

const CHAT_PAGE: &str = include_str!("../../assets/chat.html");

/// Handler: GET / and GET /chat
pub async fn chat_page_route() -> Html<&'static str> {
    Html(CHAT_PAGE)
}
